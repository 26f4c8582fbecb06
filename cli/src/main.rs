//! RefRates Binary
//!
//! Performs one conversion against the live reference-rate feeds.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refrates_cli::{Args, ServiceConfig};
use refrates_fx::{HttpFeedClient, MemoryCacheStore, RateService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = ServiceConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }
    let schedule = config.schedule().map_err(anyhow::Error::msg)?;

    let source = Arc::new(HttpFeedClient::new(config.endpoints())?);
    let service = RateService::new(source, Arc::new(MemoryCacheStore::new()), schedule);

    let request = args.request();
    info!(from = %request.source, to = ?request.target, "Converting");

    match service.convert_now(&request).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!(code = e.error_code(), client_error = e.is_client_error(), error = %e, "Conversion failed");
            Err(e.into())
        }
    }
}
