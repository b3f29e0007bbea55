//! Structural quality gate for generated content.
//!
//! Three checks per file, run in order: paired-delimiter balance over
//! the whole content, relative-import resolution against the target
//! tree, and a banned-pattern scan (leftover debug statements,
//! breakpoints, TODO/FIXME markers). Findings are purely informational
//! — they never block a write.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use serde::Serialize;

use crate::core::scan::{SOURCE_EXTENSIONS, SourceFile};
use crate::infra::line_index::NewlineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    UnbalancedDelimiters,
    UnresolvedImport,
    BannedPattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingSeverity::Error => write!(f, "error"),
            FindingSeverity::Warning => write!(f, "warning"),
            FindingSeverity::Info => write!(f, "info"),
        }
    }
}

/// One quality-gate observation, consumed by the report.
#[derive(Debug, Clone, Serialize)]
pub struct QualityFinding {
    pub file: PathBuf,
    pub kind: FindingKind,
    pub severity: FindingSeverity,
    pub message: String,
}

/// Leftover debug/breakpoint statements and work markers. Matched
/// literally; always low severity.
const BANNED_PATTERNS: &[&str] = &[
    "console.log(",
    "console.debug(",
    "debugger;",
    "breakpoint()",
    "pdb.set_trace()",
    "dbg!(",
    "TODO",
    "FIXME",
];

static BANNED_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(BANNED_PATTERNS).expect("static banned-pattern set must compile")
});

/// Run all checks for one generated file.
pub fn review_file(file: &SourceFile, target_root: &Path) -> Vec<QualityFinding> {
    let mut findings = Vec::new();

    check_balance(file, &mut findings);
    check_relative_imports(file, target_root, &mut findings);
    check_banned_patterns(file, &mut findings);

    findings
}

/// Paired-delimiter balance across the entire file content. A nonzero
/// count at end-of-content is a structural error finding.
fn check_balance(file: &SourceFile, findings: &mut Vec<QualityFinding>) {
    for (open, close, label) in [('{', '}', "brace"), ('(', ')', "parenthesis"), ('[', ']', "bracket")]
    {
        let mut count = 0i64;
        for ch in file.content.chars() {
            if ch == open {
                count += 1;
            } else if ch == close {
                count -= 1;
            }
        }

        if count != 0 {
            let (direction, n) = if count > 0 {
                ("unclosed", count)
            } else {
                ("unopened", -count)
            };
            findings.push(QualityFinding {
                file: file.rel_path.clone(),
                kind: FindingKind::UnbalancedDelimiters,
                severity: FindingSeverity::Error,
                message: format!("{n} {direction} {label}(s) at end of file"),
            });
        }
    }
}

/// Relative imports must resolve on disk under the target tree, trying
/// the path as-is, with each recognized source extension, and as an
/// index file inside a same-named directory.
fn check_relative_imports(
    file: &SourceFile,
    target_root: &Path,
    findings: &mut Vec<QualityFinding>,
) {
    let target_path = target_root.join(&file.rel_path);
    let target_dir = target_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| target_root.to_path_buf());

    for import in &file.analysis.imports {
        if !import.source.starts_with("./") && !import.source.starts_with("../") {
            continue;
        }

        let base = target_dir.join(&import.source);
        if !resolves_on_disk(&base) {
            findings.push(QualityFinding {
                file: file.rel_path.clone(),
                kind: FindingKind::UnresolvedImport,
                severity: FindingSeverity::Warning,
                message: format!(
                    "import '{}' (line {}) does not resolve under the target tree",
                    import.source, import.line
                ),
            });
        }
    }
}

fn resolves_on_disk(base: &Path) -> bool {
    if base.exists() {
        return true;
    }

    let raw = base.to_string_lossy();
    for ext in SOURCE_EXTENSIONS {
        if PathBuf::from(format!("{raw}.{ext}")).exists() {
            return true;
        }
        if base.join(format!("index.{ext}")).exists() {
            return true;
        }
    }

    false
}

/// Multi-literal scan for banned patterns; one finding per occurrence
/// with its 1-based line number.
fn check_banned_patterns(file: &SourceFile, findings: &mut Vec<QualityFinding>) {
    let index = NewlineIndex::build(file.content.as_bytes());

    for m in BANNED_MATCHER.find_iter(&file.content) {
        let pattern = BANNED_PATTERNS[m.pattern().as_usize()];
        let line = index.line_of_byte(m.start());
        let what = match pattern {
            "TODO" | "FIXME" => format!("{pattern} marker"),
            "debugger;" | "breakpoint()" | "pdb.set_trace()" => {
                format!("leftover breakpoint statement `{pattern}`")
            }
            _ => format!("leftover debug statement `{pattern}`"),
        };
        findings.push(QualityFinding {
            file: file.rel_path.clone(),
            kind: FindingKind::BannedPattern,
            severity: FindingSeverity::Info,
            message: format!("{what} at line {line}"),
        });
    }
}
