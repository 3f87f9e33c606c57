use anyhow::{Context, Result, anyhow};
use bing_gallery::config::{PipelineConfig, setup_logging};
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = bing_gallery::cli::CliOptions::parse();

    setup_logging(cli.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let config = PipelineConfig::try_from(&cli).context("Invalid configuration")?;

    // an Err out of main exits with status 1
    if let Err(err) = bing_gallery::pipeline::run(&config).await {
        error!("Gallery run failed: {}", err);
        return Err(err).context("Gallery run failed");
    }
    Ok(())
}
