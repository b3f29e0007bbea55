//! Integration orchestrator.
//!
//! Linear state machine with a single branch point:
//! Scan → DetectConflicts → QualityGate → [stop here if check-only] →
//! PreMergeTestRun → WriteFiles → PostMergeFormat → Commit → EmitReport.
//!
//! A file is written iff it carries no blocking conflict or the caller
//! forced; everything else runs unconditionally once reached. Per-file
//! write failures are recorded and never stop the remaining files. The
//! process result code is derived purely from the accumulated
//! `IntegrationOutcome`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{AppContext, IntegrateArgs};
use crate::core::detect::{self, Conflict, DetectOptions, Severity, SeverityPolicy};
use crate::core::gate::{self, QualityFinding};
use crate::core::merge::{self, MergePlanner, MergeStrategy};
use crate::core::report;
use crate::core::scan::{self, SourceFile};
use crate::core::toolchain::{self, ToolReport};
use crate::core::vcs::{self, CommitReport, ReviewReport};
use crate::infra::config::Config;
use crate::infra::io::{expand_path, read_file_smart, write_file_creating_dirs};
use crate::infra::walk::FileWalker;

/// Caller options for one integration run.
#[derive(Debug, Clone, Default)]
pub struct IntegrateOptions {
    pub check_only: bool,
    pub force: bool,
    pub skip_tests: bool,
    pub skip_vcs: bool,
    pub create_review: bool,
    pub verbose: bool,
}

/// One successfully merged file with its applied strategy.
#[derive(Debug, Clone, Serialize)]
pub struct MergedFile {
    pub path: PathBuf,
    pub strategy: MergeStrategy,
    pub changes: Vec<String>,
}

/// One file whose write failed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Accumulated result of a whole run: the orchestrator's sole return
/// value and the report renderer's sole input.
#[derive(Debug, Default, Serialize)]
pub struct IntegrationOutcome {
    pub merged: Vec<MergedFile>,
    pub created: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    pub conflicts: Vec<Conflict>,
    pub findings: Vec<QualityFinding>,
    pub tests: Option<ToolReport>,
    pub format: Option<ToolReport>,
    pub commit: Option<CommitReport>,
    pub review: Option<ReviewReport>,
}

impl IntegrationOutcome {
    pub fn has_blocking_conflicts(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.severity == Severity::Blocking)
    }

    /// Process result code: write errors trump blocking conflicts.
    pub fn exit_code(&self, forced: bool) -> i32 {
        if !self.failed.is_empty() {
            2
        } else if self.has_blocking_conflicts() && !forced {
            1
        } else {
            0
        }
    }
}

/// Run one integration of `generated_root` into `target_root`.
///
/// The only early termination is an unusable generated root; every
/// other failure is folded into the outcome.
pub fn integrate(
    generated_root: &Path,
    target_root: &Path,
    opts: &IntegrateOptions,
    config: &Config,
) -> Result<IntegrationOutcome> {
    let walker = FileWalker::new(&config.ignore_patterns)?;
    let files = scan::scan_root(generated_root, &walker)?;
    info!("scanned {} generated file(s)", files.len());

    let detect_opts = DetectOptions {
        force: opts.force,
        policy: SeverityPolicy::from_config_names(&config.integrate.escalate),
    };

    let mut outcome = IntegrationOutcome::default();

    // Detection + quality gate for every scanned file.
    let mut processed: Vec<(SourceFile, Vec<Conflict>)> = Vec::new();
    for file in files {
        outcome.findings.extend(gate::review_file(&file, target_root));

        match detect::detect_conflicts(&file, target_root, &detect_opts) {
            Ok(conflicts) => {
                outcome.conflicts.extend(conflicts.iter().cloned());
                processed.push((file, conflicts));
            }
            Err(err) => {
                warn!(
                    "conflict detection failed for {}: {err:#}",
                    file.rel_path.display()
                );
                outcome.failed.push(FailedFile {
                    path: file.rel_path.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }

    if !opts.check_only {
        if !opts.skip_tests {
            outcome.tests = Some(toolchain::run_tests(
                target_root,
                config.integrate.test_command.as_deref(),
            ));
        }

        let written = write_files(&mut outcome, processed, target_root, opts);

        if !written.is_empty() {
            outcome.format = Some(toolchain::run_formatter(
                target_root,
                config.integrate.format_command.as_deref(),
            ));

            if !opts.skip_vcs {
                let commit = vcs::commit_files(
                    target_root,
                    &written,
                    &format!("{} file(s)", written.len()),
                );
                if opts.create_review && commit.success {
                    outcome.review =
                        Some(vcs::open_review_request(target_root, "Integrate generated sources"));
                }
                outcome.commit = Some(commit);
            }
        }

        let report_text = report::render(&outcome, target_root);
        let report_path = target_root.join(&config.integrate.report_file);
        if let Err(err) = write_file_creating_dirs(&report_path, &report_text) {
            warn!("could not write integration report: {err:#}");
        }
    }

    Ok(outcome)
}

/// The only branch point of the run: write every file that is not
/// gated by a blocking conflict (or write all of them when forced).
fn write_files(
    outcome: &mut IntegrationOutcome,
    processed: Vec<(SourceFile, Vec<Conflict>)>,
    target_root: &Path,
    opts: &IntegrateOptions,
) -> Vec<PathBuf> {
    let planner = MergePlanner::new().with_force(opts.force);
    let mut written = Vec::new();

    for (mut file, conflicts) in processed {
        let blocked = conflicts.iter().any(|c| c.severity == Severity::Blocking);
        if blocked && !opts.force {
            debug!("skipping {} (blocking conflict)", file.rel_path.display());
            outcome.skipped.push(file.rel_path.clone());
            continue;
        }

        let result = match planner.plan(&file, target_root) {
            Ok(result) => result,
            Err(err) => {
                outcome.failed.push(FailedFile {
                    path: file.rel_path.clone(),
                    error: format!("{err:#}"),
                });
                continue;
            }
        };

        let target_path = target_root.join(&file.rel_path);
        if opts.verbose
            && result.strategy == MergeStrategy::IntelligentMerge
            && let Ok(existing) = read_file_smart(&target_path)
        {
            debug!(
                "planned changes for {}:\n{}",
                file.rel_path.display(),
                merge::render_preview(
                    existing.as_ref(),
                    &result.merged_content,
                    &file.rel_path.to_string_lossy(),
                )
            );
        }

        // The single content mutation of a SourceFile's lifetime.
        let strategy = result.strategy;
        let changes = result.changes;
        file.content = result.merged_content;

        match write_file_creating_dirs(&target_path, &file.content) {
            Ok(()) => {
                written.push(file.rel_path.clone());
                match strategy {
                    MergeStrategy::NewFile => outcome.created.push(file.rel_path),
                    _ => outcome.merged.push(MergedFile {
                        path: file.rel_path,
                        strategy,
                        changes,
                    }),
                }
            }
            Err(err) => {
                warn!("write failed for {}: {err:#}", file.rel_path.display());
                outcome.failed.push(FailedFile {
                    path: file.rel_path,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    written
}

/// CLI entry point. Returns the process exit code.
pub fn run(args: IntegrateArgs, ctx: &AppContext) -> Result<i32> {
    let config = crate::infra::config::load_config().unwrap_or_default();

    let generated_root = expand_path(&args.generated_root);
    let target_root = expand_path(&args.target);

    let opts = IntegrateOptions {
        check_only: args.check || ctx.dry_run,
        force: args.force,
        skip_tests: args.skip_tests,
        skip_vcs: args.skip_vcs,
        create_review: args.review,
        verbose: args.verbose,
    };

    let outcome = integrate(&generated_root, &target_root, &opts, &config)?;

    if args.json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        if opts.check_only {
            println!("{}", report::render(&outcome, &target_root));
        }
        print_summary(&outcome, ctx);
    }

    Ok(outcome.exit_code(opts.force))
}

fn print_summary(outcome: &IntegrationOutcome, ctx: &AppContext) {
    if ctx.quiet {
        return;
    }

    let line = format!(
        "{} created, {} merged, {} skipped, {} failed ({} conflict(s), {} finding(s))",
        outcome.created.len(),
        outcome.merged.len(),
        outcome.skipped.len(),
        outcome.failed.len(),
        outcome.conflicts.len(),
        outcome.findings.len(),
    );

    if ctx.no_color {
        println!("{line}");
    } else if !outcome.failed.is_empty() {
        println!("{}", line.red());
    } else if outcome.has_blocking_conflicts() {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}
