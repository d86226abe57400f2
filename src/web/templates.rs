//! HTML templates for the task board.
//!
//! Templates and assets are embedded at compile time using `include_str!`.
//! [`Templates`] is built once at startup and handed to the router as state.

use crate::terminal::TerminalOption;
use crate::types::Task;

/// The index page layout with the task list and the add form.
pub const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Stylesheet served at `/static/assets/style.css`.
pub const STYLE_CSS: &str = include_str!("assets/style.css");

/// Client script served at `/static/assets/app.js`.
pub const APP_JS: &str = include_str!("assets/app.js");

/// Look up an embedded asset by file name. Returns the body and content type.
pub fn asset(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "style.css" => Some((STYLE_CSS, "text/css; charset=utf-8")),
        "app.js" => Some((APP_JS, "application/javascript; charset=utf-8")),
        _ => None,
    }
}

/// Data rendered on the index page.
pub struct IndexPage<'a> {
    pub title: &'a str,
    pub os: &'a str,
    pub tasks: &'a [Task],
    pub status_counts: &'a [(String, i64)],
    pub terminals: &'a [TerminalOption],
}

/// Page renderer holding the layout.
#[derive(Debug, Clone)]
pub struct Templates {
    index: String,
}

impl Templates {
    /// Renderer over the embedded layout.
    pub fn embedded() -> Self {
        Self::with_index(INDEX_TEMPLATE)
    }

    /// Renderer over a custom layout using the same placeholders.
    pub fn with_index(layout: impl Into<String>) -> Self {
        Self {
            index: layout.into(),
        }
    }

    pub fn render_index(&self, page: &IndexPage<'_>) -> String {
        let values = [
            ("title", html_escape(page.title)),
            ("os", html_escape(page.os)),
            ("summary", render_summary(page.status_counts)),
            ("terminal_options", render_terminal_options(page.terminals)),
            ("task_cards", render_task_cards(page.tasks)),
        ];
        fill_placeholders(&self.index, &values)
    }
}

/// Replace each `{{name}}` in `layout` in a single pass. Substituted text is
/// never scanned again; unknown placeholders are kept as written.
fn fill_placeholders(layout: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(layout.len());
    let mut rest = layout;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

impl Default for Templates {
    fn default() -> Self {
        Self::embedded()
    }
}

fn render_summary(counts: &[(String, i64)]) -> String {
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let mut html = format!(r#"<span class="badge">{} tasks</span>"#, total);
    for (status, count) in counts {
        html.push_str(&format!(
            r#"<span class="badge {}">{}: {}</span>"#,
            status_badge_class(status),
            html_escape(status),
            count
        ));
    }
    html
}

fn render_terminal_options(terminals: &[TerminalOption]) -> String {
    if terminals.is_empty() {
        return r#"<option value="" disabled selected>No supported terminal found</option>"#
            .to_string();
    }
    terminals
        .iter()
        .map(|t| {
            format!(
                r#"<option value="{}">{}</option>"#,
                html_escape(&t.command),
                html_escape(&t.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_task_cards(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return r#"<div class="empty-state">No tasks yet. Add one with the form.</div>"#
            .to_string();
    }
    tasks.iter().map(render_task_card).collect()
}

fn render_task_card(task: &Task) -> String {
    let cover_html = if task.has_cover() {
        format!(
            r#"<img class="cover" src="{}" alt="cover">"#,
            html_escape(&task.cover)
        )
    } else {
        String::new()
    };

    let tags_html: String = task
        .tag_list()
        .iter()
        .map(|t| format!(r#"<span class="tag">{}</span>"#, html_escape(t)))
        .collect();

    let link_html = task
        .link_website
        .as_deref()
        .map(|link| {
            format!(
                r#"<a href="{0}" target="_blank" rel="noopener">{0}</a>"#,
                html_escape(link)
            )
        })
        .unwrap_or_default();

    let open_html = task
        .path_project
        .as_deref()
        .map(|path| {
            format!(
                r#"<button type="button" class="btn btn-sm" data-open-path="{}" title="{}">Open project</button>"#,
                html_escape(path),
                html_escape(path)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<article class="card task" id="task-{id}">
    {cover_html}
    <h3>{judul}</h3>
    <div><span class="badge {badge_class}">{status}</span> <span class="badge">{tipe}</span></div>
    <div class="tags">{tags_html}</div>
    <p class="notes">{catatan}</p>
    <div class="links">{link_html}</div>
    <div class="actions">
        {open_html}
        <form action="/task/delete/{id}" method="post" data-confirm="Delete this task?">
            <button type="submit" class="btn btn-danger btn-sm">Delete</button>
        </form>
    </div>
    <details>
        <summary>Edit</summary>
        <form action="/task/update/{id}" method="post" enctype="multipart/form-data">
            <label>Judul <input type="text" name="judul" value="{judul}"></label>
            <label>Status <input type="text" name="status" value="{status}" list="status-options"></label>
            <label>Tipe <input type="text" name="tipe" value="{tipe}"></label>
            <label>Tags <input type="text" name="tags" value="{tags}"></label>
            <label>Catatan <textarea name="catatan" rows="3">{catatan}</textarea></label>
            <label>Path project <input type="text" name="path_project" value="{path_project}"></label>
            <label>Link website <input type="url" name="link_website" value="{link_website}"></label>
            <label>Cover <input type="file" name="cover" accept=".jpg,.jpeg,.png"></label>
            <datalist id="status-options"><option value="todo"><option value="progress"><option value="done"></datalist>
            <button type="submit" class="btn btn-primary btn-sm">Save</button>
        </form>
    </details>
</article>
"#,
        id = task.id,
        cover_html = cover_html,
        judul = html_escape(&task.judul),
        badge_class = status_badge_class(&task.status),
        status = html_escape(&task.status),
        tipe = html_escape(&task.tipe),
        tags_html = tags_html,
        tags = html_escape(&task.tags),
        catatan = html_escape(&task.catatan),
        link_html = link_html,
        open_html = open_html,
        path_project = html_escape(task.path_project.as_deref().unwrap_or_default()),
        link_website = html_escape(task.link_website.as_deref().unwrap_or_default()),
    )
}

fn status_badge_class(status: &str) -> &'static str {
    match status {
        "todo" => "badge-todo",
        "progress" | "in_progress" | "doing" => "badge-progress",
        "done" | "completed" => "badge-done",
        _ => "",
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
