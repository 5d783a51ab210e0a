use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use kilncast_cli::cli::{Cli, Commands};
use kilncast_cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG refines the level picked on the command line.
    let level: LevelFilter = cli.log_level.into();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Convert {
            vault,
            site,
            dry_run,
            force,
            concurrency,
        } => {
            commands::convert::execute(
                cli.config.as_deref(),
                vault,
                site,
                dry_run,
                force,
                concurrency,
            )
            .await?
        }
        Commands::Status { vault, site } => {
            commands::status::execute(cli.config.as_deref(), vault, site).await?
        }
    }
    Ok(())
}
