//! Receipt polling with a two-speed wait
//!
//! A node that has not mined any block yet answers receipt lookups with
//! "transaction indexing is in progress"; that is waited out on the long
//! interval, a plain "not mined yet" on the short one. Any other node error
//! ends the wait at once.

use crate::chain::{GatewayError, RpcGateway};
use crate::config::ReceiptConfig;
use crate::error::{BurstError, BurstResult};

use ethers::types::{TransactionReceipt, H256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Attempt budget and the two wait intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Wait after an indexing-in-progress answer
    pub indexing_wait: Duration,
    /// Wait after an empty receipt
    pub pending_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&ReceiptConfig::default())
    }
}

impl From<&ReceiptConfig> for PollPolicy {
    fn from(config: &ReceiptConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            indexing_wait: config.indexing_wait(),
            pending_wait: config.pending_wait(),
        }
    }
}

impl PollPolicy {
    /// Interval to wait before the next poll; `None` for terminal outcomes
    pub fn wait_for(&self, outcome: &PollOutcome) -> Option<Duration> {
        match outcome {
            PollOutcome::Indexing => Some(self.indexing_wait),
            PollOutcome::Pending => Some(self.pending_wait),
            PollOutcome::Mined(_) | PollOutcome::Failed(_) => None,
        }
    }
}

/// Classified result of one `eth_getTransactionReceipt` call
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Mined(TransactionReceipt),
    Pending,
    Indexing,
    Failed(GatewayError),
}

impl PollOutcome {
    /// Receipt presence is checked before the error is looked at
    pub fn classify(result: Result<Option<TransactionReceipt>, GatewayError>) -> Self {
        match result {
            Ok(Some(receipt)) => PollOutcome::Mined(receipt),
            Ok(None) => PollOutcome::Pending,
            Err(e) if e.is_indexing_in_progress() => PollOutcome::Indexing,
            Err(e) => PollOutcome::Failed(e),
        }
    }

    /// Metrics label
    pub fn name(&self) -> &'static str {
        match self {
            PollOutcome::Mined(_) => "mined",
            PollOutcome::Pending => "pending",
            PollOutcome::Indexing => "indexing",
            PollOutcome::Failed(_) => "failed",
        }
    }
}

/// Polls the gateway until a transaction is mined, fails or runs out of attempts
pub struct ReceiptAwaiter {
    gateway: Arc<dyn RpcGateway>,
    policy: PollPolicy,
}

impl ReceiptAwaiter {
    pub fn new(gateway: Arc<dyn RpcGateway>, policy: PollPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Wait for the receipt of `tx_hash`
    pub async fn await_receipt(&self, tx_hash: H256) -> BurstResult<TransactionReceipt> {
        for attempt in 1..=self.policy.max_attempts {
            let outcome = PollOutcome::classify(self.gateway.transaction_receipt(tx_hash).await);
            crate::metrics::record_receipt_poll(outcome.name());

            let wait = self.policy.wait_for(&outcome);
            match outcome {
                PollOutcome::Mined(receipt) => return Ok(receipt),
                PollOutcome::Failed(source) => {
                    return Err(BurstError::Receipt { tx_hash, source });
                }
                PollOutcome::Indexing => {
                    debug!(
                        "Transaction indexing in progress for {:?} (attempt {}/{})",
                        tx_hash, attempt, self.policy.max_attempts
                    );
                }
                PollOutcome::Pending => {
                    trace!(
                        "Transaction {:?} not mined yet (attempt {}/{})",
                        tx_hash,
                        attempt,
                        self.policy.max_attempts
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                if let Some(wait) = wait {
                    tokio::time::sleep(wait).await;
                }
            }
        }

        Err(BurstError::ReceiptTimeout {
            tx_hash,
            attempts: self.policy.max_attempts,
        })
    }
}
