use clap::Parser;
use tracing_subscriber::EnvFilter;

use labelguard_agent::cli::Opts;
use labelguard_agent::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    run::execute(Opts::parse()).await
}
