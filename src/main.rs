mod cli;

use clap::Parser;
use cli::Cli;
use slowmo::config::Config;
use slowmo::coordinator::CycleCoordinator;
use slowmo::{observability, shutdown, storage};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    info!(
        dir = %config.snapshots.dir.display(),
        jobs = %config.requests.jobs_file.display(),
        workers = config.scheduler.max_threads,
        "slowmo starting"
    );

    if cli.reset {
        storage::reset(&config.snapshots.dir).await;
    }

    let mut coordinator = CycleCoordinator::from_config(&config)?;
    let shutdown = shutdown::install_shutdown_handler();

    coordinator.run(shutdown).await?;

    Ok(())
}
