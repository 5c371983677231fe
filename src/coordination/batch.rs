//! Bounded fan-out of submit-then-await tasks over a nonce range

use super::gate::AdmissionGate;
use crate::chain::RpcGateway;
use crate::error::{BurstError, BurstResult};
use crate::tx::{PollPolicy, ReceiptAwaiter, TransactionSender};

use ethers::types::{Address, H256};
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Final state of one nonce's task
#[derive(Debug)]
pub enum TaskOutcome {
    Confirmed {
        nonce: u64,
        tx_hash: H256,
        block_number: Option<u64>,
    },
    SubmissionFailed {
        nonce: u64,
        error: BurstError,
    },
    ConfirmationFailed {
        nonce: u64,
        tx_hash: H256,
        error: BurstError,
    },
    /// The task panicked or was cancelled by the runtime
    Aborted {
        nonce: u64,
        message: String,
    },
}

impl TaskOutcome {
    pub fn nonce(&self) -> u64 {
        match self {
            TaskOutcome::Confirmed { nonce, .. }
            | TaskOutcome::SubmissionFailed { nonce, .. }
            | TaskOutcome::ConfirmationFailed { nonce, .. }
            | TaskOutcome::Aborted { nonce, .. } => *nonce,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, TaskOutcome::Confirmed { .. })
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Confirmed {
                nonce,
                tx_hash,
                block_number,
            } => match block_number {
                Some(block) => write!(
                    f,
                    "nonce={} confirmed hash={:?} block={}",
                    nonce, tx_hash, block
                ),
                None => write!(f, "nonce={} confirmed hash={:?}", nonce, tx_hash),
            },
            TaskOutcome::SubmissionFailed { nonce, error } => {
                write!(f, "nonce={} not sent: {}", nonce, error)
            }
            TaskOutcome::ConfirmationFailed {
                nonce,
                tx_hash,
                error,
            } => write!(
                f,
                "nonce={} sent as {:?} but not confirmed: {}",
                nonce, tx_hash, error
            ),
            TaskOutcome::Aborted { nonce, message } => {
                write!(f, "nonce={} aborted: {}", nonce, message)
            }
        }
    }
}

/// Everything a finished batch produced, one outcome per nonce in nonce order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TaskOutcome>,
    /// Most tasks ever past the admission gate at once
    pub peak_in_flight: usize,
}

impl BatchReport {
    pub fn confirmed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_confirmed()).count()
    }

    pub fn submission_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::SubmissionFailed { .. }))
            .count()
    }

    pub fn confirmation_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::ConfirmationFailed { .. }))
            .count()
    }

    pub fn aborted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Aborted { .. }))
            .count()
    }

    #[cfg(test)]
    pub fn get(&self, nonce: u64) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.nonce() == nonce)
    }
}

/// Dispatches one task per nonce, at most `concurrency` past the gate at a time
pub struct BatchCoordinator {
    sender: Arc<TransactionSender>,
    awaiter: Arc<ReceiptAwaiter>,
    concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(gateway: Arc<dyn RpcGateway>, policy: PollPolicy, concurrency: usize) -> Self {
        Self {
            sender: Arc::new(TransactionSender::new(gateway.clone())),
            awaiter: Arc::new(ReceiptAwaiter::new(gateway, policy)),
            concurrency,
        }
    }

    /// Nonces `starting_nonce..=starting_nonce + count`
    pub fn nonce_range(starting_nonce: u64, count: u64) -> BurstResult<RangeInclusive<u64>> {
        let last = starting_nonce.checked_add(count).ok_or_else(|| {
            BurstError::Config(format!(
                "nonce range {} + {} overflows u64",
                starting_nonce, count
            ))
        })?;
        Ok(starting_nonce..=last)
    }

    /// Send `count + 1` self transfers and wait for every one of them to finish
    ///
    /// Nonces are handed out here, in order, before any task runs. Task
    /// failures stay inside their task; this returns only once all tasks are
    /// done. Dropping the returned future aborts the tasks still in flight.
    pub async fn run_batch(
        &self,
        address: Address,
        starting_nonce: u64,
        count: u64,
    ) -> BurstResult<BatchReport> {
        let nonces = Self::nonce_range(starting_nonce, count)?;
        let gate = Arc::new(AdmissionGate::new(self.concurrency));

        info!(
            "Dispatching nonces {}..={} with concurrency {}",
            nonces.start(),
            nonces.end(),
            gate.limit()
        );

        // Dropping the set aborts every task still running
        let mut tasks = JoinSet::new();
        let mut nonce_by_task = HashMap::new();
        for nonce in nonces {
            let sender = self.sender.clone();
            let awaiter = self.awaiter.clone();
            let gate = gate.clone();

            let handle = tasks.spawn(
                run_task(sender, awaiter, gate, address, nonce)
                    .instrument(info_span!("tx", nonce)),
            );
            nonce_by_task.insert(handle.id(), nonce);
        }

        // Wait for all tasks
        let mut outcomes = Vec::with_capacity(nonce_by_task.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    let Some(&nonce) = nonce_by_task.get(&e.id()) else {
                        error!("untracked batch task failed: {}", e);
                        continue;
                    };
                    error!("task for nonce={} aborted: {}", nonce, e);
                    TaskOutcome::Aborted {
                        nonce,
                        message: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(TaskOutcome::nonce);

        Ok(BatchReport {
            outcomes,
            peak_in_flight: gate.peak(),
        })
    }
}

async fn run_task(
    sender: Arc<TransactionSender>,
    awaiter: Arc<ReceiptAwaiter>,
    gate: Arc<AdmissionGate>,
    address: Address,
    nonce: u64,
) -> TaskOutcome {
    let _admission = match gate.admit().await {
        Ok(admission) => admission,
        Err(e) => {
            return TaskOutcome::Aborted {
                nonce,
                message: e.to_string(),
            }
        }
    };
    let started = Instant::now();

    let tx_hash = match sender.submit_self_transaction(address, nonce).await {
        Ok(tx_hash) => tx_hash,
        Err(error) => {
            error!("{}", error);
            crate::metrics::record_submission_failed();
            return TaskOutcome::SubmissionFailed { nonce, error };
        }
    };

    match awaiter.await_receipt(tx_hash).await {
        Ok(receipt) => {
            let block_number = receipt.block_number.map(|b| b.as_u64());
            info!(
                "sent tx hash={:?} nonce={} blockNumber={}",
                receipt.transaction_hash,
                nonce,
                block_number.map_or_else(|| "pending".to_string(), |b| b.to_string())
            );
            crate::metrics::record_tx_confirmed(started.elapsed().as_secs_f64());

            TaskOutcome::Confirmed {
                nonce,
                tx_hash: receipt.transaction_hash,
                block_number,
            }
        }
        Err(error) => {
            error!("error waiting tx nonce={} err={}", nonce, error);
            crate::metrics::record_confirmation_failed();
            TaskOutcome::ConfirmationFailed {
                nonce,
                tx_hash,
                error,
            }
        }
    }
}
