use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "graftup")]
#[command(
    about = "A fast CLI for integrating machine-generated source files into an existing code tree"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Integrate a generated-output tree into a target project
    Integrate(IntegrateArgs),

    /// Analyze generated files and print their structural summaries
    Scan(ScanArgs),

    /// Initialize a graftup.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct IntegrateArgs {
    /// Root directory containing the generated output
    pub generated_root: PathBuf,

    /// Target project root to integrate into
    #[arg(short, long, default_value = ".")]
    pub target: PathBuf,

    /// Detect and report only; write nothing
    #[arg(long)]
    pub check: bool,

    /// Overwrite existing files unconditionally
    #[arg(long)]
    pub force: bool,

    /// Skip the pre-merge test run
    #[arg(long)]
    pub skip_tests: bool,

    /// Skip the post-merge commit
    #[arg(long)]
    pub skip_vcs: bool,

    /// Open a review request after committing
    #[arg(long)]
    pub review: bool,

    /// Log planned merges as unified diffs
    #[arg(long)]
    pub verbose: bool,

    /// Output the outcome in JSON format (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output file path (JSONL); stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
