//! Error types for the burst driver

use ethers::types::{H256, U256};
use thiserror::Error;

use crate::chain::GatewayError;

/// Main error type for a burst run
#[derive(Error, Debug)]
pub enum BurstError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("error dialing server url={url}: {message}")]
    Dial { url: String, message: String },

    #[error("error obtaining coinbase: {0}")]
    Coinbase(GatewayError),

    #[error("error obtaining coinbase's initial nonce: {0}")]
    Nonce(GatewayError),

    #[error("coinbase's transaction count {0} does not fit in 64 bits")]
    NonceOverflow(U256),

    #[error("error sending tx nonce={nonce} err={source}")]
    Submission {
        nonce: u64,
        #[source]
        source: GatewayError,
    },

    #[error("receipt lookup failed for tx hash={tx_hash:?}: {source}")]
    Receipt {
        tx_hash: H256,
        #[source]
        source: GatewayError,
    },

    #[error("timeout waiting tx hash={tx_hash:?} to be mined after {attempts} attempts")]
    ReceiptTimeout { tx_hash: H256, attempts: u32 },
}

impl BurstError {
    /// Setup errors abort the whole run before any task is spawned
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BurstError::Config(_)
                | BurstError::Dial { .. }
                | BurstError::Coinbase(_)
                | BurstError::Nonce(_)
                | BurstError::NonceOverflow(_)
        )
    }
}

/// Result type for burst operations
pub type BurstResult<T> = Result<T, BurstError>;
