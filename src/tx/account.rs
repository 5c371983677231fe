//! Sending account resolution
//!
//! The coinbase and its transaction count are read exactly once per run; every
//! other nonce in the batch is derived from that value by increment.

use crate::chain::RpcGateway;
use crate::error::{BurstError, BurstResult};

use ethers::types::{Address, BlockNumber, U256};
use std::sync::Arc;
use tracing::info;

/// Sender address plus the first nonce the batch may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub starting_nonce: u64,
}

/// Reads the node's coinbase and its current nonce
pub struct AccountResolver {
    gateway: Arc<dyn RpcGateway>,
}

impl AccountResolver {
    pub fn new(gateway: Arc<dyn RpcGateway>) -> Self {
        Self { gateway }
    }

    /// Resolve address and starting nonce; any failure here is fatal
    pub async fn resolve(&self) -> BurstResult<Account> {
        let address = self.resolve_coinbase().await?;
        let starting_nonce = self.resolve_starting_nonce(address).await?;

        Ok(Account {
            address,
            starting_nonce,
        })
    }

    /// `eth_coinbase`
    pub async fn resolve_coinbase(&self) -> BurstResult<Address> {
        let coinbase = self.gateway.coinbase().await.map_err(BurstError::Coinbase)?;
        info!("coinbase={:?}", coinbase);
        Ok(coinbase)
    }

    /// `eth_getTransactionCount(address, "latest")`
    pub async fn resolve_starting_nonce(&self, address: Address) -> BurstResult<u64> {
        let count = self
            .gateway
            .transaction_count(address, BlockNumber::Latest)
            .await
            .map_err(BurstError::Nonce)?;

        if count > U256::from(u64::MAX) {
            return Err(BurstError::NonceOverflow(count));
        }

        let nonce = count.as_u64();
        info!("nonce={}", nonce);
        Ok(nonce)
    }
}
