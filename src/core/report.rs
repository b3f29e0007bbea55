//! Integration report rendering.
//!
//! Takes the accumulated `IntegrationOutcome` — its sole input — and
//! produces the structured text document written at the target root
//! (or printed in check-only mode): summary, files integrated,
//! conflicts by severity, quality-gate results, test results, and
//! version-control result.

use std::path::Path;

use itertools::Itertools;

use crate::core::detect::{Conflict, Severity};
use crate::core::gate::FindingSeverity;
use crate::core::integrate::IntegrationOutcome;

/// Render the full report as Markdown-flavored structured text.
pub fn render(outcome: &IntegrationOutcome, target_root: &Path) -> String {
    let mut out = String::new();

    out.push_str("# Integration Report\n\n");
    out.push_str(&format!(
        "- Target: `{}`\n- Date: {}\n\n",
        target_root.display(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    ));

    render_summary(outcome, &mut out);
    render_files(outcome, &mut out);
    render_conflicts(outcome, &mut out);
    render_findings(outcome, &mut out);
    render_tests(outcome, &mut out);
    render_vcs(outcome, &mut out);

    out
}

fn render_summary(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Summary\n\n");
    out.push_str(&format!(
        "| Created | Merged | Skipped | Failed |\n|---|---|---|---|\n| {} | {} | {} | {} |\n\n",
        outcome.created.len(),
        outcome.merged.len(),
        outcome.skipped.len(),
        outcome.failed.len(),
    ));

    if !outcome.conflicts.is_empty() {
        let tally = outcome
            .conflicts
            .iter()
            .counts_by(|c| c.severity)
            .into_iter()
            .sorted_by_key(|(severity, _)| *severity)
            .map(|(severity, n)| format!("{n} {severity}"))
            .join(", ");
        out.push_str(&format!("Conflicts: {tally}.\n\n"));
    }
}

fn render_files(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Files Integrated\n\n");

    if outcome.created.is_empty()
        && outcome.merged.is_empty()
        && outcome.skipped.is_empty()
        && outcome.failed.is_empty()
    {
        out.push_str("No files were processed.\n\n");
        return;
    }

    for path in &outcome.created {
        out.push_str(&format!("- `{}` — new file\n", path.display()));
    }
    for merged in &outcome.merged {
        out.push_str(&format!(
            "- `{}` — {}\n",
            merged.path.display(),
            merged.strategy
        ));
        for change in &merged.changes {
            out.push_str(&format!("  - {change}\n"));
        }
    }
    for path in &outcome.skipped {
        out.push_str(&format!(
            "- `{}` — skipped (blocking conflict)\n",
            path.display()
        ));
    }
    for failed in &outcome.failed {
        out.push_str(&format!(
            "- `{}` — FAILED: {}\n",
            failed.path.display(),
            failed.error
        ));
    }
    out.push('\n');
}

fn render_conflicts(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Conflicts\n\n");

    if outcome.conflicts.is_empty() {
        out.push_str("None detected.\n\n");
        return;
    }

    for severity in [Severity::Blocking, Severity::Warning, Severity::Info] {
        let group: Vec<&Conflict> = outcome
            .conflicts
            .iter()
            .filter(|c| c.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }

        out.push_str(&format!("### {severity}\n\n"));
        for conflict in group {
            out.push_str(&format!(
                "- `{}`: {}\n",
                conflict.source_file.display(),
                conflict.message
            ));
            for hint in &conflict.resolution_hints {
                out.push_str(&format!("  - hint: {hint}\n"));
            }
        }
        out.push('\n');
    }
}

fn render_findings(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Quality Gate\n\n");

    if outcome.findings.is_empty() {
        out.push_str("No findings.\n\n");
        return;
    }

    for severity in [
        FindingSeverity::Error,
        FindingSeverity::Warning,
        FindingSeverity::Info,
    ] {
        for finding in outcome.findings.iter().filter(|f| f.severity == severity) {
            out.push_str(&format!(
                "- [{severity}] `{}`: {}\n",
                finding.file.display(),
                finding.message
            ));
        }
    }
    out.push('\n');
}

fn render_tests(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Test Results\n\n");

    match &outcome.tests {
        None => out.push_str("Not run.\n\n"),
        Some(report) if !report.available => {
            out.push_str(&format!("Unavailable: {}\n\n", report.output));
        }
        Some(report) => {
            let verdict = if report.success { "PASSED" } else { "FAILED" };
            out.push_str(&format!("{verdict}\n\n"));
            if !report.output.trim().is_empty() {
                out.push_str(&format!("```\n{}\n```\n\n", report.output.trim_end()));
            }
        }
    }
}

fn render_vcs(outcome: &IntegrationOutcome, out: &mut String) {
    out.push_str("## Version Control\n\n");

    match &outcome.commit {
        None => out.push_str("Skipped.\n"),
        Some(commit) => {
            let marker = if commit.success { "✓" } else { "⚠" };
            out.push_str(&format!("{marker} {}\n", commit.message));
        }
    }

    if let Some(review) = &outcome.review {
        let marker = if review.success { "✓" } else { "⚠" };
        out.push_str(&format!("{marker} {}\n", review.message));
    }

    if let Some(format) = &outcome.format {
        if format.available {
            let verdict = if format.success { "applied" } else { "failed" };
            out.push_str(&format!("Formatting: {verdict}.\n"));
        }
    }
    out.push('\n');
}
