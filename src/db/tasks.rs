//! Task CRUD operations.
//!
//! The free functions take a plain `&Connection` so they can run inside a
//! `rusqlite::Transaction` (which derefs to `Connection`). The `Database`
//! methods wrap them for one-shot use.

use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::{NewTask, Task, TaskPatch};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const TASK_COLUMNS: &str = "id, judul, status, tipe, path_project, link_website, tags, catatan, cover, created_at, updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        judul: row.get("judul")?,
        status: row.get("status")?,
        tipe: row.get("tipe")?,
        path_project: row.get("path_project")?,
        link_website: row.get("link_website")?,
        tags: row.get("tags")?,
        catatan: row.get("catatan")?,
        cover: row.get("cover")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Look a task up on an existing connection or transaction.
pub fn get_task_in(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    let task = conn
        .query_row(&sql, params![id], parse_task_row)
        .optional()?;
    Ok(task)
}

/// Like [`get_task_in`] but fails with a not-found error when the row is missing.
pub fn find_task_in(conn: &Connection, id: i64) -> Result<Task> {
    get_task_in(conn, id)?.ok_or_else(|| AppError::task_not_found(id).into())
}

/// Insert a new row and return it with its assigned id.
pub fn insert_task(conn: &Connection, input: &NewTask, status: &str) -> Result<Task> {
    let now = now_ms();
    conn.execute(
        "INSERT INTO tasks (judul, status, tipe, path_project, link_website, tags, catatan, cover, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', ?8, ?8)",
        params![
            input.judul,
            status,
            input.tipe,
            input.path_project,
            input.link_website,
            input.tags,
            input.catatan,
            now,
        ],
    )?;

    Ok(Task {
        id: conn.last_insert_rowid(),
        judul: input.judul.clone(),
        status: status.to_string(),
        tipe: input.tipe.clone(),
        path_project: input.path_project.clone(),
        link_website: input.link_website.clone(),
        tags: input.tags.clone(),
        catatan: input.catatan.clone(),
        cover: String::new(),
        created_at: now,
        updated_at: now,
    })
}

/// Write every column of `task` back to its row.
pub fn save_task_in(conn: &Connection, task: &Task) -> Result<Task> {
    let now = now_ms();
    let changed = conn.execute(
        "UPDATE tasks SET judul = ?1, status = ?2, tipe = ?3, path_project = ?4, link_website = ?5,
                tags = ?6, catatan = ?7, cover = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            task.judul,
            task.status,
            task.tipe,
            task.path_project,
            task.link_website,
            task.tags,
            task.catatan,
            task.cover,
            now,
            task.id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::task_not_found(task.id).into());
    }

    let mut saved = task.clone();
    saved.updated_at = now;
    Ok(saved)
}

/// Apply a field-level patch to `existing` and persist it.
/// An empty patch leaves the row untouched.
pub fn apply_patch(conn: &Connection, existing: &Task, patch: &TaskPatch) -> Result<Task> {
    if patch.is_empty() {
        return Ok(existing.clone());
    }
    let mut task = existing.clone();
    patch.apply_to(&mut task);
    save_task_in(conn, &task)
}

/// Set the cover column for a task.
pub fn set_cover(conn: &Connection, id: i64, cover: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE tasks SET cover = ?1, updated_at = ?2 WHERE id = ?3",
        params![cover, now_ms(), id],
    )?;
    if changed == 0 {
        return Err(AppError::task_not_found(id).into());
    }
    Ok(())
}

impl Database {
    /// Create a task with the given status.
    pub fn create_task(&self, input: &NewTask, status: &str) -> Result<Task> {
        self.with_conn(|conn| insert_task(conn, input, status))
    }

    /// Get a task by id.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_in(conn, id))
    }

    /// Get a task by id, failing with a not-found error when absent.
    pub fn find_task(&self, id: i64) -> Result<Task> {
        self.with_conn(|conn| find_task_in(conn, id))
    }

    /// List all tasks.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Save every column of an existing task.
    pub fn save_task(&self, task: &Task) -> Result<Task> {
        self.with_conn(|conn| save_task_in(conn, task))
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    /// Count tasks grouped by status, most common first.
    pub fn status_counts(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM tasks GROUP BY status ORDER BY COUNT(*) DESC, status",
            )?;
            let counts = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(counts)
        })
    }
}
