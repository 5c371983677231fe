//! Nonce Burst - concurrent self-transfer smoke test for a JSON-RPC node
//!
//! Reads the node's coinbase and nonce, sends a batch of nonce-sequenced self
//! transfers with bounded concurrency and waits for each receipt.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

mod chain;
mod config;
mod coordination;
mod error;
mod metrics;
mod tx;

use chain::HttpGateway;
use config::{LoggingConfig, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    init_logging(&settings.logging);

    info!("Starting Nonce Burst v{}", env!("CARGO_PKG_VERSION"));

    let gateway = match HttpGateway::dial(&settings.rpc.url) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Connected to {}", gateway.url());

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);

    let report = match coordination::run_burst(gateway, &settings)
        .instrument(span)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    info!(
        "Batch finished: {} confirmed, {} send failures, {} wait failures, {} aborted (peak in flight {})",
        report.confirmed(),
        report.submission_failures(),
        report.confirmation_failures(),
        report.aborted(),
        report.peak_in_flight
    );

    let unconfirmed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| !o.is_confirmed())
        .collect();
    if !unconfirmed.is_empty() {
        let nonces: Vec<u64> = unconfirmed.iter().map(|o| o.nonce()).collect();
        info!("Unconfirmed nonces: {:?}", nonces);
        for outcome in unconfirmed {
            debug!("{}", outcome);
        }
    }

    if settings.metrics.dump_on_exit {
        info!("Metrics:\n{}", metrics::render());
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nonce_burst=debug,hyper=warn"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}
