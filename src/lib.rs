//! **graftup** - CLI for integrating machine-generated source files into an existing code tree
//!
//! Detects file/symbol/import collisions between generated output and the target
//! project, then merges automatically, flags for manual resolution, or safely skips.
//! Lexical analysis only: table-driven extraction rules, no parser.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core integration engine - scan, detect, merge, gate, orchestrate
pub mod core {
    /// Generated-tree scanning with recognized-extension filtering
    pub mod scan;
    pub use scan::{SourceFile, run as scan_run};

    /// Lexical structural analysis (imports, exports, functions, classes, types)
    pub mod analyze;
    pub use analyze::{FileAnalysis, ImportRef, Language, SymbolRef};

    /// Multi-granularity conflict detection with severity tagging
    pub mod detect;
    pub use detect::{Conflict, ConflictKind, Severity};

    /// Merge planning: new-file, overwrite, or intelligent merge
    pub mod merge;
    pub use merge::{MergePlanner, MergeResult, MergeStrategy};

    /// Structural quality gate (balance, import resolution, banned patterns)
    pub mod gate;
    pub use gate::{FindingKind, FindingSeverity, QualityFinding};

    /// Test-runner and formatter collaborators
    pub mod toolchain;

    /// Version-control collaborator (commit, review request)
    pub mod vcs;

    /// Integration orchestrator and outcome accumulation
    pub mod integrate;
    pub use integrate::{IntegrateOptions, IntegrationOutcome, run as integrate_run};

    /// Integration report rendering
    pub mod report;
}

/// Infrastructure - Configuration, I/O, and utilities
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use self::config::{Config, init as config_init, load_config};

    /// Smart file I/O (memory-mapped above 1 MiB) and path expansion
    pub mod io;
    pub use io::{FileContent, expand_path, read_file_smart};

    /// Newline index for byte→line mapping
    pub mod line_index;
    pub use line_index::NewlineIndex;

    /// Pruning directory walker for generated trees
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, FileWalker, load_config};
pub use self::core::{integrate_run, scan_run};

// Core types for external consumers
pub use self::core::analyze::{FileAnalysis, Language};
pub use self::core::detect::{Conflict, ConflictKind, Severity};
pub use self::core::integrate::{IntegrateOptions, IntegrationOutcome};
pub use self::core::merge::MergeStrategy;
