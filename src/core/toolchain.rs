//! External tool collaborators: test runner and formatter.
//!
//! Each collaborator is one blocking subprocess invocation with a
//! narrow observable contract — availability, pass/fail, and captured
//! output. A failing or missing tool degrades to a report warning;
//! it never aborts an integration.

use std::path::Path;
use std::process::Command;

use serde::Serialize;
use tracing::{debug, warn};

/// Captured output is bounded so the report stays readable.
const OUTPUT_LIMIT: usize = 4000;

/// Result of one collaborator invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReport {
    pub tool: String,
    pub available: bool,
    pub success: bool,
    pub output: String,
}

impl ToolReport {
    fn unavailable(tool: &str, reason: &str) -> Self {
        Self {
            tool: tool.to_string(),
            available: false,
            success: false,
            output: reason.to_string(),
        }
    }
}

/// Run the project's test command under `root`.
///
/// `override_cmd` (from config) wins; otherwise the command is
/// detected from the project's build files.
pub fn run_tests(root: &Path, override_cmd: Option<&str>) -> ToolReport {
    let argv = match resolve_command(root, override_cmd, detect_test_command) {
        Some(argv) => argv,
        None => return ToolReport::unavailable("tests", "no test command detected"),
    };
    run_command("tests", &argv, root)
}

/// Run the project's formatter under `root`.
pub fn run_formatter(root: &Path, override_cmd: Option<&str>) -> ToolReport {
    let argv = match resolve_command(root, override_cmd, detect_format_command) {
        Some(argv) => argv,
        None => return ToolReport::unavailable("formatter", "no format command detected"),
    };
    run_command("formatter", &argv, root)
}

fn resolve_command(
    root: &Path,
    override_cmd: Option<&str>,
    detect: fn(&Path) -> Option<Vec<String>>,
) -> Option<Vec<String>> {
    match override_cmd {
        Some(cmd) if !cmd.trim().is_empty() => {
            Some(cmd.split_whitespace().map(str::to_string).collect())
        }
        _ => detect(root),
    }
}

fn detect_test_command(root: &Path) -> Option<Vec<String>> {
    if root.join("Cargo.toml").exists() {
        return Some(vec!["cargo".into(), "test".into()]);
    }
    if root.join("package.json").exists() {
        return Some(vec!["npm".into(), "test".into(), "--silent".into()]);
    }
    if root.join("pyproject.toml").exists() || root.join("setup.py").exists() {
        return Some(vec!["pytest".into()]);
    }
    None
}

fn detect_format_command(root: &Path) -> Option<Vec<String>> {
    if root.join("Cargo.toml").exists() {
        return Some(vec!["cargo".into(), "fmt".into()]);
    }
    if root.join("package.json").exists() {
        return Some(vec!["npx".into(), "prettier".into(), "--write".into(), ".".into()]);
    }
    if root.join("pyproject.toml").exists() {
        return Some(vec!["black".into(), ".".into()]);
    }
    None
}

fn run_command(tool: &str, argv: &[String], root: &Path) -> ToolReport {
    debug!("running {tool}: {}", argv.join(" "));

    let output = match Command::new(&argv[0]).args(&argv[1..]).current_dir(root).output() {
        Ok(output) => output,
        Err(err) => {
            warn!("{tool} command {:?} could not be spawned: {err}", argv[0]);
            return ToolReport::unavailable(tool, &format!("failed to spawn {}: {err}", argv[0]));
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    ToolReport {
        tool: tool.to_string(),
        available: true,
        success: output.status.success(),
        output: tail(&text, OUTPUT_LIMIT),
    }
}

/// Keep the last `limit` bytes of tool output (failures print at the
/// end), respecting char boundaries.
fn tail(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("…{}", &text[start..])
}
