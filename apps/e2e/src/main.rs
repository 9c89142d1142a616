use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jibutest_e2e::{run_scenario, Cli};

const DEFAULT_LOG_FILTER: &str = "info,jibutest=info,kube=warn";

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    info!("{:#?}", cli);
    let config = cli.into_config()?;

    let report = run_scenario(&config).await?;
    info!("backup and restore succeeded: {:#?}", report);
    Ok(())
}
