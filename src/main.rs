use clap::Parser;
use cluster_upgrader::cli::Cli;

use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

pub fn init() -> anyhow::Result<()> {
    // Setup tracing layers
    let logger = tracing_subscriber::fmt::layer().compact();
    let env_filter = EnvFilter::try_from_default_env().or(EnvFilter::try_new("info"))?;

    let collector = Registry::default().with(logger).with(env_filter);

    // Initialize tracing
    tracing::subscriber::set_global_default(collector)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init()?;

    let report = cli.run().await?;
    println!(
        "Successfully upgraded the cluster to version: {}",
        report.version
    );
    Ok(())
}
