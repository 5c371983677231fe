//! Coordination of a burst run
//!
//! A run:
//! 1. Resolves the coinbase and its starting nonce once
//! 2. Fans out one submit-then-await task per nonce behind an admission gate
//! 3. Waits for every task, whatever its outcome

pub mod batch;
pub mod gate;

pub use batch::{BatchCoordinator, BatchReport};

use crate::chain::RpcGateway;
use crate::config::Settings;
use crate::error::BurstResult;
use crate::tx::{AccountResolver, PollPolicy};

use std::sync::Arc;

/// Resolve the account and run the whole batch
///
/// Only account resolution can fail this; per-nonce failures land in the
/// report.
pub async fn run_burst(
    gateway: Arc<dyn RpcGateway>,
    settings: &Settings,
) -> BurstResult<BatchReport> {
    let account = AccountResolver::new(gateway.clone()).resolve().await?;

    let coordinator = BatchCoordinator::new(
        gateway,
        PollPolicy::from(&settings.receipt),
        settings.batch.concurrency,
    );

    coordinator
        .run_batch(account.address, account.starting_nonce, settings.batch.count)
        .await
}
