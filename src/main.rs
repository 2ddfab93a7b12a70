mod cli;
mod config;
mod db;
mod decode;
mod download;
mod error;
mod index;
mod observation;
mod pipeline;
#[cfg(test)]
mod test_support;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use config::Config;
use db::PgStore;
use pipeline::{HttpSource, Pipeline};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghcn_yearly=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli).context("Invalid arguments")?;
    info!(
        "Collecting {} station(s) for years {}",
        config.stations.len(),
        config.years.join(",")
    );

    let source = HttpSource::new(&config.base_url);
    let store = PgStore::new(config.database.clone());
    let report = Pipeline::new(config, source, store)
        .run()
        .await
        .context("Run aborted")?;

    for failure in report.failures() {
        error!(
            "{}: {}",
            failure.path.display(),
            failure.error.as_deref().unwrap_or_default()
        );
    }

    let failed = report.failures().count();
    if failed > 0 {
        return Err(anyhow!(
            "{} of {} archives failed",
            failed,
            report.archives.len()
        ));
    }

    println!(
        "{} archives processed, {} rows loaded, {} year prefixes unmatched",
        report.archives.len(),
        report.rows_loaded(),
        report.unmatched.len()
    );

    Ok(())
}
