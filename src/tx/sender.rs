//! Self transfer submission

use crate::chain::{RpcGateway, TransferRequest};
use crate::error::{BurstError, BurstResult};

use ethers::types::{Address, H256};
use std::sync::Arc;
use tracing::debug;

/// Submits one self transfer per call; never retries
pub struct TransactionSender {
    gateway: Arc<dyn RpcGateway>,
}

impl TransactionSender {
    pub fn new(gateway: Arc<dyn RpcGateway>) -> Self {
        Self { gateway }
    }

    /// Send `address -> address` at exactly `nonce`
    ///
    /// A gateway error only fails this nonce and is returned as is.
    pub async fn submit_self_transaction(&self, address: Address, nonce: u64) -> BurstResult<H256> {
        let request = TransferRequest::to_self(address, nonce);

        let tx_hash = self
            .gateway
            .send_transaction(request)
            .await
            .map_err(|source| BurstError::Submission { nonce, source })?;

        debug!("Transaction sent: {:?} nonce={}", tx_hash, nonce);
        crate::metrics::record_tx_submitted();

        Ok(tx_hash)
    }
}
