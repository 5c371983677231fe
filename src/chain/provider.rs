//! HTTP gateway backed by an ethers provider

use super::{GatewayError, RpcGateway, TransferRequest};
use crate::error::{BurstError, BurstResult};

use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, BlockNumber, TransactionReceipt, TransactionRequest, H256, U256};
use tracing::debug;

/// Raw JSON-RPC access to a single node endpoint
///
/// Calls go out as plain `Provider::request`s so nothing is filled in client
/// side; the node picks gas and signs with its unlocked coinbase.
pub struct HttpGateway {
    url: String,
    provider: Provider<Http>,
}

impl HttpGateway {
    /// Build a provider for `url`
    ///
    /// HTTP is connectionless, so this only validates the endpoint; an
    /// unreachable node surfaces on the first call.
    pub fn dial(url: &str) -> BurstResult<Self> {
        let provider = Provider::<Http>::try_from(url).map_err(|e| BurstError::Dial {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        debug!("Created HTTP provider for {}", url);

        Ok(Self {
            url: url.to_string(),
            provider,
        })
    }

    /// Endpoint this gateway talks to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcGateway for HttpGateway {
    async fn coinbase(&self) -> Result<Address, GatewayError> {
        self.provider
            .request("eth_coinbase", ())
            .await
            .map_err(GatewayError::from)
    }

    async fn transaction_count(
        &self,
        address: Address,
        block: BlockNumber,
    ) -> Result<U256, GatewayError> {
        self.provider
            .request("eth_getTransactionCount", (address, block))
            .await
            .map_err(GatewayError::from)
    }

    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, GatewayError> {
        let tx: TransactionRequest = request.into();
        self.provider
            .request("eth_sendTransaction", [tx])
            .await
            .map_err(GatewayError::from)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, GatewayError> {
        self.provider
            .request("eth_getTransactionReceipt", [tx_hash])
            .await
            .map_err(GatewayError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_accepts_http_url() {
        let gateway = HttpGateway::dial("http://localhost:8545").unwrap();
        assert_eq!(gateway.url(), "http://localhost:8545");
    }

    #[test]
    fn test_dial_rejects_malformed_url() {
        let err = HttpGateway::dial("not a url").err().unwrap();
        assert!(err.is_fatal());
        assert!(matches!(err, BurstError::Dial { .. }));
    }
}
