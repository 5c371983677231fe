//! Chain module - the JSON-RPC gateway the burst talks to
//!
//! This module provides:
//! - The `RpcGateway` trait, one typed method per node call the driver makes
//! - `GatewayError`, which keeps node-reported errors apart from transport failures
//! - An ethers-backed HTTP implementation shared by every task

pub mod provider;

#[cfg(test)]
pub mod stub;

pub use provider::HttpGateway;

use async_trait::async_trait;
use ethers::providers::{ProviderError, RpcError};
use ethers::types::{Address, BlockNumber, TransactionReceipt, TransactionRequest, H256, U256};
use thiserror::Error;

/// Message a node returns for receipt lookups before its tx index is queryable
pub const INDEXING_IN_PROGRESS: &str = "transaction indexing is in progress";

/// Error returned by a gateway call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// JSON-RPC error response from the node
    #[error("{message}")]
    Rpc { code: i64, message: String },

    /// Anything short of a node response: connection, HTTP, decoding
    #[error("{0}")]
    Transport(String),
}

impl GatewayError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        GatewayError::Rpc {
            code,
            message: message.into(),
        }
    }

    /// Whether the node is still building its transaction index
    pub fn is_indexing_in_progress(&self) -> bool {
        matches!(self, GatewayError::Rpc { message, .. } if message == INDEXING_IN_PROGRESS)
    }
}

impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(resp) => GatewayError::Rpc {
                code: resp.code,
                message: resp.message.clone(),
            },
            None => GatewayError::Transport(err.to_string()),
        }
    }
}

/// Self transfer handed to `eth_sendTransaction`; the node fills gas and signs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
}

impl TransferRequest {
    pub fn to_self(address: Address, nonce: u64) -> Self {
        Self {
            from: address,
            to: address,
            nonce,
        }
    }
}

impl From<TransferRequest> for TransactionRequest {
    fn from(req: TransferRequest) -> Self {
        TransactionRequest::new()
            .from(req.from)
            .to(req.to)
            .nonce(req.nonce)
    }
}

/// Node calls the driver depends on
///
/// Implementations are shared by all in-flight tasks and must tolerate
/// concurrent use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcGateway: Send + Sync {
    /// `eth_coinbase`
    async fn coinbase(&self) -> Result<Address, GatewayError>;

    /// `eth_getTransactionCount(address, block)`
    async fn transaction_count(
        &self,
        address: Address,
        block: BlockNumber,
    ) -> Result<U256, GatewayError>;

    /// `eth_sendTransaction({from, to, nonce})`
    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, GatewayError>;

    /// `eth_getTransactionReceipt(hash)`; `None` until the transaction is mined
    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, GatewayError>;
}
