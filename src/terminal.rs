//! Launch a local terminal with an editor at a project path.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Editor started inside the terminal.
pub const EDITOR: &str = "nvim";

/// A terminal emulator the page can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOption {
    pub name: String,
    /// Launch command; the first word is the executable looked up on `PATH`.
    pub command: String,
}

impl TerminalOption {
    fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
        }
    }

    fn executable(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or_default()
    }
}

/// Request sent over the WebSocket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OpenRequest {
    #[serde(default)]
    pub terminal: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("project path is empty")]
    EmptyPath,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A concrete process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchPlan {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Name of the current platform ("linux", "macos", ...).
pub fn current_os() -> &'static str {
    std::env::consts::OS
}

/// Terminals known for `os`, regardless of whether they are installed.
pub fn known_terminals(os: &str) -> Vec<TerminalOption> {
    match os {
        "linux" => vec![
            TerminalOption::new("Kitty", "kitty"),
            TerminalOption::new("GNOME Terminal", "gnome-terminal"),
            TerminalOption::new("Konsole", "konsole"),
            TerminalOption::new("XTerm", "xterm"),
            TerminalOption::new("Alacritty", "alacritty"),
            TerminalOption::new("Terminator", "terminator"),
        ],
        "macos" => vec![
            TerminalOption::new("iTerm2", "open -a iTerm"),
            TerminalOption::new("Terminal", "open -a Terminal"),
            TerminalOption::new("Kitty", "kitty"),
            TerminalOption::new("Alacritty", "alacritty"),
        ],
        _ => Vec::new(),
    }
}

/// Terminals for the current platform whose executable is on `PATH`.
pub fn available_terminals() -> Vec<TerminalOption> {
    installed_terminals(current_os(), std::env::var_os("PATH"))
}

/// Terminals known for `os` whose executable is found in `paths`.
pub fn installed_terminals(os: &str, paths: Option<OsString>) -> Vec<TerminalOption> {
    let cwd = std::env::current_dir().unwrap_or_default();
    known_terminals(os)
        .into_iter()
        .filter(|t| which::which_in(t.executable(), paths.as_ref(), &cwd).is_ok())
        .collect()
}

/// Build the command that opens `terminal` at `path` on `os`.
///
/// Unknown terminals on linux fall back to xterm.
pub fn launch_plan(os: &str, terminal: &str, path: &str) -> Result<LaunchPlan, TerminalError> {
    if path.trim().is_empty() {
        return Err(TerminalError::EmptyPath);
    }
    match os {
        "linux" => {
            let plan = if terminal.contains("kitty") {
                LaunchPlan::new("kitty", &["--directory", path, EDITOR])
            } else if terminal.contains("gnome-terminal") {
                LaunchPlan::new("gnome-terminal", &["--working-directory", path, "--", EDITOR])
            } else if terminal.contains("konsole") {
                LaunchPlan::new("konsole", &["--workdir", path, "-e", EDITOR])
            } else if terminal.contains("alacritty") {
                LaunchPlan::new("alacritty", &["--working-directory", path, "-e", EDITOR])
            } else if terminal.contains("terminator") {
                LaunchPlan::new("terminator", &["--working-directory", path, "-x", EDITOR])
            } else {
                let script = format!("cd {} && {}", shell_quote(path), EDITOR);
                LaunchPlan::new("xterm", &["-e", &script])
            };
            Ok(plan)
        }
        "macos" => {
            let script = format!(
                r#"tell application "Terminal" to do script "cd {} && {}""#,
                applescript_escape(&shell_quote(path)),
                EDITOR
            );
            Ok(LaunchPlan::new("osascript", &["-e", &script]))
        }
        other => Err(TerminalError::UnsupportedPlatform(other.to_string())),
    }
}

/// Spawn `terminal` at `path` as a detached process and return immediately.
pub fn open_terminal(terminal: &str, path: &str) -> Result<(), TerminalError> {
    let plan = launch_plan(current_os(), terminal, path)?;
    spawn_detached(&plan)
}

fn spawn_detached(plan: &LaunchPlan) -> Result<(), TerminalError> {
    let mut cmd = Command::new(&plan.program);
    cmd.args(&plan.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Dropping the handle releases the child; it keeps running after we return.
    cmd.spawn().map(drop).map_err(|source| TerminalError::Spawn {
        program: plan.program.clone(),
        source,
    })
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'\''"#))
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn only_executable_files_count_as_installed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("kitty"), "").unwrap();
        let alacritty = temp.path().join("alacritty");
        std::fs::write(&alacritty, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&alacritty, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = installed_terminals("linux", Some(temp.path().as_os_str().to_owned()));

        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Alacritty"]);
    }

    #[test]
    fn nothing_is_installed_without_a_path() {
        assert!(installed_terminals("linux", None).is_empty());
        assert!(installed_terminals("plan9", std::env::var_os("PATH")).is_empty());
    }

    #[test]
    fn linux_templates_substitute_the_path() {
        let plan = launch_plan("linux", "kitty", "/work/app").unwrap();
        assert_eq!(plan.program, "kitty");
        assert_eq!(plan.args, vec!["--directory", "/work/app", "nvim"]);

        let plan = launch_plan("linux", "gnome-terminal", "/work/app").unwrap();
        assert_eq!(
            plan.args,
            vec!["--working-directory", "/work/app", "--", "nvim"]
        );
    }

    #[test]
    fn unknown_linux_terminal_falls_back_to_xterm() {
        let plan = launch_plan("linux", "mystery-term", "/tmp/my project").unwrap();
        assert_eq!(plan.program, "xterm");
        assert_eq!(plan.args, vec!["-e", "cd '/tmp/my project' && nvim"]);
    }

    #[test]
    fn macos_uses_osascript() {
        let plan = launch_plan("macos", "open -a Terminal", "/Users/me/app").unwrap();
        assert_eq!(plan.program, "osascript");
        assert_eq!(plan.args[0], "-e");
        assert!(plan.args[1].contains("cd '/Users/me/app' && nvim"));
    }

    #[test]
    fn unsupported_platform_and_empty_path_are_rejected() {
        assert!(matches!(
            launch_plan("windows", "cmd", "C:\\work"),
            Err(TerminalError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            launch_plan("linux", "kitty", "  "),
            Err(TerminalError::EmptyPath)
        ));
    }

    #[test]
    fn catalogue_depends_on_platform() {
        assert_eq!(known_terminals("linux").len(), 6);
        assert_eq!(known_terminals("macos")[0].executable(), "open");
        assert!(known_terminals("windows").is_empty());
    }

    #[test]
    fn open_request_tolerates_missing_keys() {
        let req: OpenRequest = serde_json::from_str(r#"{"path": "/srv"}"#).unwrap();
        assert_eq!(req.terminal, "");
        assert_eq!(req.path, "/srv");
    }
}
