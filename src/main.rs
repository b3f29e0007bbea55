use anyhow::Result;
use clap::Parser;
use graftup::cli::{AppContext, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    init_tracing(&cli);

    match cli.command {
        Commands::Integrate(args) => {
            let code = graftup::integrate_run(args, &ctx)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Scan(args) => graftup::scan_run(args, &ctx),
        Commands::Init(args) => graftup::infra::config::init(args, &ctx),
        Commands::Completions(args) => graftup::completion::run(args, &ctx),
    }
}

/// RUST_LOG wins; --verbose on integrate raises the default to debug.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let default = match &cli.command {
        Commands::Integrate(args) if args.verbose => "graftup=debug",
        _ => "graftup=warn",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
