//! Multi-granularity conflict detection.
//!
//! Compares a generated file's analysis against the file already at the
//! same relative path under the target root (if any) and emits typed,
//! severity-tagged conflict records at three granularities: whole file,
//! individual symbols, and imports.
//!
//! Emission order for a file is fixed — file, functions, classes,
//! types, imports — because the merge planner consumes the records
//! positionally when building its change log. A file/entity pair is
//! never reported twice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::core::analyze::{self, FileAnalysis, SymbolRef};
use crate::core::scan::SourceFile;
use crate::infra::io::read_file_smart;

/// Conflict categories, ordered by granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    FileExists,
    FunctionOverlap,
    ClassOverlap,
    TypeOverlap,
    ImportMerge,
}

impl ConflictKind {
    /// Config-facing name, matching the serialized form.
    pub fn from_config_name(name: &str) -> Option<ConflictKind> {
        match name {
            "file_exists" => Some(ConflictKind::FileExists),
            "function_overlap" => Some(ConflictKind::FunctionOverlap),
            "class_overlap" => Some(ConflictKind::ClassOverlap),
            "type_overlap" => Some(ConflictKind::TypeOverlap),
            "import_merge" => Some(ConflictKind::ImportMerge),
            _ => None,
        }
    }
}

/// Conflict severity. Only `Blocking` ever gates a write, and the
/// detector itself never produces it; escalation is a caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Blocking => write!(f, "blocking"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One detected collision. Created during detection, never mutated;
/// consumed read-only by the report and the orchestrator's skip
/// decision.
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub source_file: PathBuf,
    pub target_path: PathBuf,
    pub entity: Option<String>,
    pub message: String,
    pub resolution_hints: Vec<String>,
}

/// Caller policy upgrading selected conflict kinds to blocking.
#[derive(Debug, Default, Clone)]
pub struct SeverityPolicy {
    escalate: HashSet<ConflictKind>,
}

impl SeverityPolicy {
    /// Build from config names; unknown names are ignored.
    pub fn from_config_names(names: &[String]) -> Self {
        Self {
            escalate: names
                .iter()
                .filter_map(|n| ConflictKind::from_config_name(n))
                .collect(),
        }
    }

    fn apply(&self, kind: ConflictKind, severity: Severity) -> Severity {
        if self.escalate.contains(&kind) {
            Severity::Blocking
        } else {
            severity
        }
    }
}

/// Options influencing detection.
#[derive(Debug, Default, Clone)]
pub struct DetectOptions {
    /// Unconditional overwrite requested: `file_exists` drops to info.
    pub force: bool,
    pub policy: SeverityPolicy,
}

/// Detect all conflicts between `generated` and its counterpart under
/// `target_root`. No counterpart means no conflicts.
pub fn detect_conflicts(
    generated: &SourceFile,
    target_root: &Path,
    opts: &DetectOptions,
) -> Result<Vec<Conflict>> {
    let target_path = target_root.join(&generated.rel_path);
    if !target_path.exists() {
        return Ok(Vec::new());
    }

    let existing_content = read_file_smart(&target_path)?;
    let existing = analyze::analyze_path(existing_content.as_ref(), &generated.rel_path);

    let mut conflicts = Vec::new();
    let push = |conflicts: &mut Vec<Conflict>,
                kind: ConflictKind,
                severity: Severity,
                entity: Option<String>,
                message: String,
                hints: Vec<String>| {
        conflicts.push(Conflict {
            kind,
            severity: opts.policy.apply(kind, severity),
            source_file: generated.rel_path.clone(),
            target_path: target_path.clone(),
            entity,
            message,
            resolution_hints: hints,
        });
    };

    // 1. Whole-file collision.
    let file_severity = if opts.force {
        Severity::Info
    } else {
        Severity::Warning
    };
    push(
        &mut conflicts,
        ConflictKind::FileExists,
        file_severity,
        None,
        format!("target file {} already exists", target_path.display()),
        vec![
            "overwrite the existing file (--force)".to_string(),
            "apply an intelligent merge (default)".to_string(),
            "write a sibling .generated file for review".to_string(),
            "skip this file".to_string(),
        ],
    );

    // 2–4. Symbol overlaps: functions, classes, types — in that order.
    for (kind, severity, label, generated_refs, existing_refs) in [
        (
            ConflictKind::FunctionOverlap,
            Severity::Warning,
            "function",
            &generated.analysis.functions,
            &existing.functions,
        ),
        (
            ConflictKind::ClassOverlap,
            Severity::Warning,
            "class",
            &generated.analysis.classes,
            &existing.classes,
        ),
        (
            ConflictKind::TypeOverlap,
            Severity::Info,
            "type",
            &generated.analysis.types,
            &existing.types,
        ),
    ] {
        for overlap in overlapping(generated_refs, existing_refs) {
            push(
                &mut conflicts,
                kind,
                severity,
                Some(overlap.generated.name.clone()),
                format!(
                    "{label} '{}' declared in generated file (line {}) already exists in target (line {})",
                    overlap.generated.name, overlap.generated.line, overlap.existing.line
                ),
                vec![format!(
                    "keep the existing {label} and port changes manually; bodies are never auto-merged"
                )],
            );
        }
    }

    // 5. Imports, as a single aggregate record.
    let new_imports = new_import_count(&generated.analysis, &existing);
    if new_imports > 0 {
        push(
            &mut conflicts,
            ConflictKind::ImportMerge,
            Severity::Info,
            None,
            format!("{new_imports} new import(s) will be merged into the target"),
            vec!["new imports are inserted after the target's existing imports".to_string()],
        );
    }

    Ok(conflicts)
}

struct Overlap<'a> {
    generated: &'a SymbolRef,
    existing: &'a SymbolRef,
}

/// Symbols present in both lists, matched by exact name, in generated
/// declaration order. Analysis already deduplicates names, so a pair
/// appears at most once.
fn overlapping<'a>(generated: &'a [SymbolRef], existing: &'a [SymbolRef]) -> Vec<Overlap<'a>> {
    generated
        .iter()
        .filter_map(|g| {
            existing
                .iter()
                .find(|e| e.name == g.name)
                .map(|e| Overlap {
                    generated: g,
                    existing: e,
                })
        })
        .collect()
}

/// Count of generated imports whose source is absent from the target.
fn new_import_count(generated: &FileAnalysis, existing: &FileAnalysis) -> usize {
    let existing_sources: HashSet<&str> =
        existing.imports.iter().map(|i| i.source.as_str()).collect();

    generated
        .imports
        .iter()
        .filter(|i| !existing_sources.contains(i.source.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::Language;

    fn generated_file(rel: &str, content: &str) -> SourceFile {
        SourceFile {
            abs_path: PathBuf::from("/gen").join(rel),
            rel_path: PathBuf::from(rel),
            content: content.to_string(),
            analysis: analyze::analyze(content, Language::TypeScript),
        }
    }

    fn target_with(rel: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        dir
    }

    #[test]
    fn no_target_file_means_no_conflicts() {
        let dir = tempfile::TempDir::new().unwrap();
        let generated = generated_file("util.ts", "export function add() {}\n");

        let conflicts =
            detect_conflicts(&generated, dir.path(), &DetectOptions::default()).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn emission_order_is_file_then_symbols_then_imports() {
        let generated = generated_file(
            "util.ts",
            "import \"./math\";\nexport function add() {}\nexport class Calc {}\nexport interface P {}\n",
        );
        let dir = target_with(
            "util.ts",
            "export function add() {}\nexport class Calc {}\nexport interface P {}\n",
        );

        let conflicts =
            detect_conflicts(&generated, dir.path(), &DetectOptions::default()).unwrap();

        let kinds: Vec<_> = conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConflictKind::FileExists,
                ConflictKind::FunctionOverlap,
                ConflictKind::ClassOverlap,
                ConflictKind::TypeOverlap,
                ConflictKind::ImportMerge,
            ]
        );
    }

    #[test]
    fn severities_follow_the_kind() {
        let generated = generated_file(
            "util.ts",
            "export function add() {}\nexport interface P {}\n",
        );
        let dir = target_with(
            "util.ts",
            "export function add() {}\nexport interface P {}\n",
        );

        let conflicts =
            detect_conflicts(&generated, dir.path(), &DetectOptions::default()).unwrap();

        assert_eq!(conflicts[0].severity, Severity::Warning); // file_exists
        assert_eq!(conflicts[1].severity, Severity::Warning); // function
        assert_eq!(conflicts[2].severity, Severity::Info); // type
    }

    #[test]
    fn force_downgrades_file_exists_to_info() {
        let generated = generated_file("util.ts", "const x = 1;\n");
        let dir = target_with("util.ts", "const y = 2;\n");

        let opts = DetectOptions {
            force: true,
            ..Default::default()
        };
        let conflicts = detect_conflicts(&generated, dir.path(), &opts).unwrap();

        assert_eq!(conflicts[0].kind, ConflictKind::FileExists);
        assert_eq!(conflicts[0].severity, Severity::Info);
    }

    #[test]
    fn imports_are_aggregated_into_one_record() {
        let generated = generated_file(
            "util.ts",
            "import \"./a\";\nimport \"./b\";\nimport \"./c\";\n",
        );
        let dir = target_with("util.ts", "import \"./a\";\n");

        let conflicts =
            detect_conflicts(&generated, dir.path(), &DetectOptions::default()).unwrap();

        let imports: Vec<_> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::ImportMerge)
            .collect();
        assert_eq!(imports.len(), 1);
        assert!(imports[0].message.contains("2 new import(s)"));
    }

    #[test]
    fn escalation_policy_upgrades_to_blocking() {
        let generated = generated_file("util.ts", "export function add() {}\n");
        let dir = target_with("util.ts", "export function add() {}\n");

        let opts = DetectOptions {
            force: false,
            policy: SeverityPolicy::from_config_names(&["function_overlap".to_string()]),
        };
        let conflicts = detect_conflicts(&generated, dir.path(), &opts).unwrap();

        let function = conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::FunctionOverlap)
            .unwrap();
        assert_eq!(function.severity, Severity::Blocking);
        assert_eq!(function.entity.as_deref(), Some("add"));
    }

    #[test]
    fn file_exists_lists_four_resolutions() {
        let generated = generated_file("util.ts", "const x = 1;\n");
        let dir = target_with("util.ts", "const y = 2;\n");

        let conflicts =
            detect_conflicts(&generated, dir.path(), &DetectOptions::default()).unwrap();
        assert_eq!(conflicts[0].resolution_hints.len(), 4);
    }
}
