use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Extra ignore globs applied when scanning generated output
    pub ignore_patterns: Vec<String>,

    /// Integration engine settings
    pub integrate: IntegrateConfig,

    /// Scan/analysis settings
    pub scan: ScanConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrateConfig
{
    /// Project test command (auto-detected when empty)
    pub test_command: Option<String>,

    /// Project format command (auto-detected when empty)
    pub format_command: Option<String>,

    /// Conflict kinds escalated to blocking severity
    /// (file_exists, function_overlap, class_overlap, type_overlap,
    /// import_merge). Empty by default: nothing blocks on its own.
    pub escalate: Vec<String>,

    /// File name of the emitted report at the target root
    pub report_file: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig
{
    /// Default output for `gup scan` (stdout when empty)
    pub output_file: Option<String>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "*.min.js".to_string(),
                "*.map".to_string(),
                "*.lock".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
            ],
            integrate: IntegrateConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl Default for IntegrateConfig
{
    fn default() -> Self
    {
        Self {
            test_command: None,
            format_command: None,
            escalate: Vec::new(),
            report_file: "INTEGRATION_REPORT.md".to_string(),
        }
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["graftup.toml", ".graftup.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with GRAFTUP_ prefix
    builder = builder.add_source(config::Environment::with_prefix("GRAFTUP").separator("_"));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("graftup.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
