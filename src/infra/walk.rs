//! Filepath: src/infra/walk.rs
//! File walker for generated-output trees.
//! - Prunes hidden directories (leading '.') recursively
//! - Prunes dependency-cache directories (node_modules, target, ...)
//! - Extra ignore globs (early prune + late filter)
//! - Respects .gitignore when the tree happens to carry one
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.
//!
//! Generated output usually lives outside a repository, so the
//! gitignore handling is opportunistic; the hidden/deny pruning is the
//! contract this walker must always honor.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Directory names that are never worth scanning: dependency caches
/// and build output.
pub const DENY_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    "vendor",
    "venv",
];

/// Walker with hidden/deny-list pruning and optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Maximum recursion depth; default None (unbounded)
    max_depth: Option<usize>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g., "*.min.js",
    /// "fixtures/**"). Patterns match on (relative) paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            max_depth: None,
        })
    }

    /// (Optional) Limit recursion depth (`None` = unbounded).
    pub fn with_max_depth(
        mut self,
        depth: Option<usize>,
    ) -> Self
    {
        self.max_depth = depth;
        self
    }

    /// True when a directory name must be pruned outright.
    fn is_denied_dir(name: &str) -> bool
    {
        name.starts_with('.') || DENY_DIRS.contains(&name)
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Hidden *files* stay visible; hidden *directories* are pruned
        // below in filter_entry.
        b.hidden(false);

        // Respect ignore files when present (harmless otherwise)
        b.git_ignore(true);
        b.git_global(false);
        b.git_exclude(true);

        b.follow_links(false);
        b.max_depth(self.max_depth);

        // Early directory pruning: hidden marker, deny list, extra globs.
        let extra = self
            .ignore_patterns
            .clone();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }

            // Keep the traversal root itself even when it is hidden.
            if ent.depth() == 0
            {
                return true;
            }

            let name = ent
                .file_name()
                .to_string_lossy();
            if Self::is_denied_dir(&name)
            {
                return false;
            }

            !extra.is_match(ent.path())
        });

        b
    }

    /// Traverse files under `root`, applying pruning and extra globs.
    /// Returns a **sorted** list of file paths for determinism.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            // Drop entries with IO errors (logged upstream if needed)
            .filter_map(|res| res.ok())
            // Keep only regular files
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            // Convert to owned path
            .map(|entry| entry.into_path())
            // Late file-level extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .collect();

        // Deterministic order (stable CLI & tests)
        out.sort();

        out
    }
}
