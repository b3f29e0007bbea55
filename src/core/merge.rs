//! Merge planning and content synthesis.
//!
//! Chooses exactly one strategy per generated file and produces the
//! merged content plus a human-readable change list:
//!
//! - `NewFile` — no target counterpart; generated content verbatim.
//! - `Overwrite` — caller forced; generated content verbatim.
//! - `IntelligentMerge` — add only what is new: imports are spliced in
//!   after the target's last import, new function blocks are appended,
//!   and standalone exports are appended last. Symbols whose names
//!   collide with the target are never auto-merged; they stay behind as
//!   conflicts for manual resolution.
//!
//! Function blocks are carved out of the generated content by
//! brace-depth counting from the declaration line (indentation depth
//! for offside-rule languages). Braces inside string or comment
//! literals are counted too — a known limitation of the lexical
//! approach; extraction that never rebalances skips that function and
//! leaves the rest of the merge intact.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::core::analyze::{self, Language};
use crate::core::scan::SourceFile;
use crate::infra::io::read_file_smart;

/// Strategy applied to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    NewFile,
    Overwrite,
    IntelligentMerge,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::NewFile => write!(f, "new file"),
            MergeStrategy::Overwrite => write!(f, "overwrite"),
            MergeStrategy::IntelligentMerge => write!(f, "intelligent merge"),
        }
    }
}

/// Output of planning one file: written to disk and discarded.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub strategy: MergeStrategy,
    pub merged_content: String,
    pub changes: Vec<String>,
}

/// Per-run merge planner.
#[derive(Debug, Default)]
pub struct MergePlanner {
    force: bool,
}

impl MergePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Choose a strategy for `generated` and produce merged content.
    pub fn plan(&self, generated: &SourceFile, target_root: &Path) -> Result<MergeResult> {
        let target_path = target_root.join(&generated.rel_path);

        if !target_path.exists() {
            return Ok(MergeResult {
                strategy: MergeStrategy::NewFile,
                merged_content: generated.content.clone(),
                changes: Vec::new(),
            });
        }

        if self.force {
            return Ok(MergeResult {
                strategy: MergeStrategy::Overwrite,
                merged_content: generated.content.clone(),
                changes: vec!["replaced existing content".to_string()],
            });
        }

        let existing = read_file_smart(&target_path)?;
        let (merged_content, changes) = intelligent_merge(generated, existing.as_ref());

        Ok(MergeResult {
            strategy: MergeStrategy::IntelligentMerge,
            merged_content,
            changes,
        })
    }
}

/// Unified-diff preview of a planned merge, for verbose output.
pub fn render_preview(existing: &str, merged: &str, label: &str) -> String {
    use similar::TextDiff;

    TextDiff::from_lines(existing, merged)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

/// The intelligent-merge algorithm: deterministic and order-preserving.
fn intelligent_merge(generated: &SourceFile, existing_content: &str) -> (String, Vec<String>) {
    let language = generated.analysis.language;

    // Step 1: recompute the target's analysis against its current
    // content; the scan-time analysis may be stale.
    let existing = analyze::analyze(existing_content, language);

    let mut changes = Vec::new();
    let mut lines: Vec<String> = existing_content.lines().map(str::to_string).collect();
    let had_trailing_newline = existing_content.is_empty() || existing_content.ends_with('\n');

    let generated_lines: Vec<&str> = generated.content.lines().collect();

    // Step 2: imports. Insert each new import's literal line after the
    // target's last import (or at the top), preserving generated order.
    let existing_sources: HashSet<&str> =
        existing.imports.iter().map(|i| i.source.as_str()).collect();

    let mut insert_at = existing
        .imports
        .iter()
        .map(|i| i.line)
        .max()
        .unwrap_or(0); // 0-based insertion index == after 1-based line

    let mut added_imports = 0usize;
    for import in &generated.analysis.imports {
        if existing_sources.contains(import.source.as_str()) {
            continue;
        }
        let Some(line) = generated_lines.get(import.line.saturating_sub(1)) else {
            continue;
        };
        lines.insert(insert_at.min(lines.len()), (*line).to_string());
        insert_at += 1;
        added_imports += 1;
    }
    if added_imports > 0 {
        changes.push(format!("added {added_imports} new import(s)"));
    }

    // Step 3: functions. Append blocks for names the target lacks;
    // colliding names are left out entirely.
    let existing_functions: HashSet<&str> =
        existing.functions.iter().map(|f| f.name.as_str()).collect();

    for function in &generated.analysis.functions {
        if existing_functions.contains(function.name.as_str()) {
            continue;
        }
        match extract_block(&generated_lines, function.line.saturating_sub(1), language) {
            Some(block) => {
                append_with_blank_line(&mut lines, &block);
                changes.push(format!("added function {}()", function.name));
            }
            None => {
                // Unbalanced extraction: silent, reported-later
                // degradation, never fatal.
                debug!(
                    "could not determine block boundaries for function {}; skipped",
                    function.name
                );
            }
        }
    }

    // Step 4: exports. Append standalone export lines for names the
    // target does not export yet. An export whose line *is* a
    // function/class/type declaration belongs to the earlier steps (or
    // to a conflict) — re-appending that line would duplicate the
    // declaration.
    let existing_exports: HashSet<&str> =
        existing.exports.iter().map(|e| e.name.as_str()).collect();
    let declaration_lines: HashSet<(&str, usize)> = generated
        .analysis
        .functions
        .iter()
        .chain(&generated.analysis.classes)
        .chain(&generated.analysis.types)
        .map(|s| (s.name.as_str(), s.line))
        .collect();

    let mut added_exports = 0usize;
    for export in &generated.analysis.exports {
        if existing_exports.contains(export.name.as_str())
            || declaration_lines.contains(&(export.name.as_str(), export.line))
        {
            continue;
        }
        let Some(line) = generated_lines.get(export.line.saturating_sub(1)) else {
            continue;
        };
        append_with_blank_line(&mut lines, *line);
        added_exports += 1;
    }
    if added_exports > 0 {
        changes.push(format!("added {added_exports} new export(s)"));
    }

    let mut merged = lines.join("\n");
    if had_trailing_newline && !merged.is_empty() {
        merged.push('\n');
    }

    (merged, changes)
}

/// Append `block` to `lines`, separated by exactly one blank line.
fn append_with_blank_line(lines: &mut Vec<String>, block: &str) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.extend(block.lines().map(str::to_string));
}

/// Carve the full block starting at `start_idx` (0-based line index)
/// out of `lines`. Returns `None` when the block never rebalances
/// before end-of-file.
pub fn extract_block(lines: &[&str], start_idx: usize, language: Language) -> Option<String> {
    if start_idx >= lines.len() {
        return None;
    }
    if language.uses_braces() {
        extract_braced_block(lines, start_idx)
    } else {
        Some(extract_indented_block(lines, start_idx))
    }
}

/// Brace-depth counting from the declaration line until nesting
/// returns to zero. A brace-free declaration that terminates on its
/// own line (arrow-function expressions) is a complete block.
fn extract_braced_block(lines: &[&str], start_idx: usize) -> Option<String> {
    let first = lines[start_idx];
    if !first.contains('{') && first.trim_end().ends_with(';') {
        return Some(first.to_string());
    }

    let mut depth = 0i64;
    let mut opened = false;

    for (offset, line) in lines[start_idx..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }

        if opened && depth <= 0 {
            return Some(lines[start_idx..=start_idx + offset].join("\n"));
        }
    }

    // Walked past end-of-file without balancing.
    None
}

/// Offside-rule block: the declaration line plus every following line
/// indented deeper than it (blank lines included), trailing blanks
/// trimmed.
fn extract_indented_block(lines: &[&str], start_idx: usize) -> String {
    let decl_indent = indent_width(lines[start_idx]);

    let mut end = start_idx + 1;
    while end < lines.len() {
        let line = lines[end];
        if !line.trim().is_empty() && indent_width(line) <= decl_indent {
            break;
        }
        end += 1;
    }

    // Trim trailing blank lines out of the block.
    while end > start_idx + 1 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }

    lines[start_idx..end].join("\n")
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn generated_file(rel: &str, content: &str) -> SourceFile {
        SourceFile {
            abs_path: PathBuf::from("/gen").join(rel),
            rel_path: PathBuf::from(rel),
            content: content.to_string(),
            analysis: analyze::analyze_path(content, Path::new(rel)),
        }
    }

    fn target_with(rel: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(rel), content).unwrap();
        dir
    }

    #[test]
    fn missing_target_yields_new_file_verbatim() {
        let dir = tempfile::TempDir::new().unwrap();
        let generated = generated_file("util.ts", "export function add() {}\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert_eq!(result.strategy, MergeStrategy::NewFile);
        assert_eq!(result.merged_content, generated.content);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn force_overwrites_regardless_of_conflicts() {
        let generated = generated_file("util.ts", "export function add() { return 1; }\n");
        let dir = target_with("util.ts", "export function add() { return 2; }\n");

        let result = MergePlanner::new()
            .with_force(true)
            .plan(&generated, dir.path())
            .unwrap();
        assert_eq!(result.strategy, MergeStrategy::Overwrite);
        assert_eq!(result.merged_content, generated.content);
    }

    #[test]
    fn new_import_is_spliced_after_last_existing_import() {
        let generated = generated_file(
            "util.ts",
            "import { a } from \"./a\";\nimport { m } from \"./math\";\n",
        );
        let dir = target_with(
            "util.ts",
            "import { a } from \"./a\";\n\nexport function add() {}\n",
        );

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        let lines: Vec<&str> = result.merged_content.lines().collect();

        assert_eq!(lines[0], "import { a } from \"./a\";");
        assert_eq!(lines[1], "import { m } from \"./math\";");
        assert_eq!(result.changes, vec!["added 1 new import(s)"]);
    }

    #[test]
    fn imports_go_to_top_when_target_has_none() {
        let generated = generated_file("util.ts", "import \"./math\";\n");
        let dir = target_with("util.ts", "export function add() {}\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert!(result.merged_content.starts_with("import \"./math\";\n"));
    }

    #[test]
    fn new_function_is_appended_with_one_blank_line() {
        let generated = generated_file(
            "util.ts",
            "export function subtract(a: number, b: number) {\n    return a - b;\n}\n",
        );
        let dir = target_with("util.ts", "export function add() {\n    return 1;\n}\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert_eq!(
            result.merged_content,
            "export function add() {\n    return 1;\n}\n\nexport function subtract(a: number, b: number) {\n    return a - b;\n}\n"
        );
        assert_eq!(result.changes, vec!["added function subtract()"]);
    }

    #[test]
    fn colliding_function_keeps_existing_body_only() {
        let generated = generated_file(
            "util.ts",
            "export function add() {\n    return 999;\n}\n",
        );
        let dir = target_with("util.ts", "export function add() {\n    return 1;\n}\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert!(result.merged_content.contains("return 1;"));
        assert!(!result.merged_content.contains("return 999;"));
        assert!(result.changes.is_empty());
    }

    #[test]
    fn standalone_export_is_appended() {
        let generated = generated_file(
            "util.ts",
            "const helper = () => 1;\nexport { helper };\n",
        );
        // Target already has the helper but does not export it; the
        // function step skips it (name collision), and the export step
        // appends the export list line.
        let dir = target_with("util.ts", "const helper = () => 1;\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert!(result.merged_content.ends_with("export { helper };\n"));
        assert_eq!(result.changes, vec!["added 1 new export(s)"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let generated = generated_file(
            "util.ts",
            "import \"./math\";\n\nexport function subtract(a, b) {\n    return a - b;\n}\n",
        );
        let dir = target_with("util.ts", "export function add(a, b) {\n    return a + b;\n}\n");

        let first = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert!(!first.changes.is_empty());

        // Second run: the generated input is the first run's output.
        std::fs::write(dir.path().join("util.ts"), &first.merged_content).unwrap();
        let regenerated = generated_file("util.ts", &first.merged_content);

        let second = MergePlanner::new().plan(&regenerated, dir.path()).unwrap();
        assert!(second.changes.is_empty(), "changes: {:?}", second.changes);
        assert_eq!(second.merged_content, first.merged_content);
    }

    #[test]
    fn braced_block_extraction_balances_nesting() {
        let lines: Vec<&str> = vec![
            "function outer() {",
            "    if (x) {",
            "        return { a: 1 };",
            "    }",
            "}",
            "function next() {}",
        ];
        let block = extract_block(&lines, 0, Language::TypeScript).unwrap();
        assert_eq!(block.lines().count(), 5);
        assert!(block.ends_with("}"));
    }

    #[test]
    fn unbalanced_block_returns_none() {
        let lines: Vec<&str> = vec!["function broken() {", "    return 1;"];
        assert_eq!(extract_block(&lines, 0, Language::TypeScript), None);
    }

    #[test]
    fn single_line_arrow_function_is_its_own_block() {
        let lines: Vec<&str> = vec!["const mul = (a, b) => a * b;", "const next = 1;"];
        let block = extract_block(&lines, 0, Language::TypeScript).unwrap();
        assert_eq!(block, "const mul = (a, b) => a * b;");
    }

    #[test]
    fn python_block_uses_indentation() {
        let lines: Vec<&str> = vec![
            "def handler(event):",
            "    if event:",
            "        return 1",
            "",
            "    return 0",
            "",
            "def other():",
            "    pass",
        ];
        let block = extract_block(&lines, 0, Language::Python).unwrap();
        assert_eq!(
            block,
            "def handler(event):\n    if event:\n        return 1\n\n    return 0"
        );
    }

    #[test]
    fn unbalanced_function_degrades_to_skip() {
        // Generated function never closes its brace; the merge keeps
        // the target untouched for that step instead of failing.
        let generated = generated_file(
            "util.ts",
            "export function broken() {\n    return 1;\n",
        );
        let dir = target_with("util.ts", "export function add() {}\n");

        let result = MergePlanner::new().plan(&generated, dir.path()).unwrap();
        assert_eq!(result.strategy, MergeStrategy::IntelligentMerge);
        assert!(!result.merged_content.contains("broken"));
        assert!(result.changes.is_empty());
    }

    #[test]
    fn preview_renders_unified_diff() {
        let diff = render_preview("a\n", "a\nb\n", "util.ts");
        assert!(diff.contains("+b"));
        assert!(diff.contains("a/util.ts"));
    }
}
