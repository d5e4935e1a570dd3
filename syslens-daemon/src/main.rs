use anyhow::Result;
use clap::Parser;

use syslens_daemon::cli::DaemonCli;
use syslens_daemon::logging;
use syslens_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = cli.load_config().await?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    if !cli.config.exists() {
        tracing::info!(
            path = %cli.config.display(),
            "config file not found, using built-in defaults"
        );
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "syslens-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    if cli.no_stdin {
        orchestrator = orchestrator.without_filter_input();
    }

    orchestrator.run().await?;

    tracing::info!("syslens-daemon shut down");
    Ok(())
}
