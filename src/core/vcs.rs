//! Version-control collaborator: stage-and-commit and review requests.
//!
//! Both operations shell out to `git`/`gh` and are strictly
//! best-effort: any failure is folded into the returned report as a
//! warning and never aborts the integration.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct CommitReport {
    pub success: bool,
    pub commit_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub success: bool,
    pub url: Option<String>,
    pub message: String,
}

fn git(root: &Path, args: &[&str]) -> Result<String, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|err| format!("failed to spawn git: {err}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Stage `files` and commit them with a generated message. Returns the
/// short commit identifier on success.
pub fn commit_files(root: &Path, files: &[PathBuf], summary: &str) -> CommitReport {
    if files.is_empty() {
        return CommitReport {
            success: false,
            commit_id: None,
            message: "nothing to commit".to_string(),
        };
    }

    let mut add_args: Vec<&str> = vec!["add", "--"];
    let rels: Vec<String> = files.iter().map(|f| f.to_string_lossy().into_owned()).collect();
    add_args.extend(rels.iter().map(String::as_str));

    if let Err(err) = git(root, &add_args) {
        warn!("git add failed: {err}");
        return CommitReport {
            success: false,
            commit_id: None,
            message: format!("git add failed: {err}"),
        };
    }

    let message = format!("Integrate generated sources: {summary}");
    if let Err(err) = git(root, &["commit", "-m", &message]) {
        warn!("git commit failed: {err}");
        return CommitReport {
            success: false,
            commit_id: None,
            message: format!("git commit failed: {err}"),
        };
    }

    match git(root, &["rev-parse", "--short", "HEAD"]) {
        Ok(id) => CommitReport {
            success: true,
            commit_id: Some(id.clone()),
            message: format!("committed as {id}"),
        },
        Err(err) => CommitReport {
            // Commit landed even if the id lookup failed.
            success: true,
            commit_id: None,
            message: format!("committed (id lookup failed: {err})"),
        },
    }
}

/// Open a review request for the current branch via the `gh` CLI.
/// Returns the request URL on success.
pub fn open_review_request(root: &Path, title: &str) -> ReviewReport {
    let output = Command::new("gh")
        .args(["pr", "create", "--title", title, "--body", "Automated integration of generated sources."])
        .current_dir(root)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let url = stdout
                .lines()
                .rev()
                .find(|l| l.starts_with("https://"))
                .map(str::to_string);
            ReviewReport {
                success: true,
                url: url.clone(),
                message: url.unwrap_or_else(|| "review request opened".to_string()),
            }
        }
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr).trim().to_string();
            warn!("gh pr create failed: {err}");
            ReviewReport {
                success: false,
                url: None,
                message: format!("review request failed: {err}"),
            }
        }
        Err(err) => {
            warn!("gh could not be spawned: {err}");
            ReviewReport {
                success: false,
                url: None,
                message: format!("gh unavailable: {err}"),
            }
        }
    }
}
