//! Scripted in-memory gateway for tests

use super::{GatewayError, RpcGateway, TransferRequest};

use async_trait::async_trait;
use ethers::types::{Address, BlockNumber, TransactionReceipt, H256, U256, U64};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted answer to `eth_getTransactionReceipt`
#[derive(Debug, Clone)]
pub enum Reply {
    Mined,
    Pending,
    Fail(GatewayError),
}

/// Hash the stub hands out for a given nonce
pub fn hash_for(nonce: u64) -> H256 {
    H256::from_low_u64_be(nonce + 1)
}

/// Block the stub reports a nonce as mined in
pub fn block_for(nonce: u64) -> u64 {
    nonce + 100
}

pub fn receipt(tx_hash: H256, block_number: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash,
        block_number: Some(U64::from(block_number)),
        status: Some(U64::from(1)),
        ..Default::default()
    }
}

/// Gateway whose answers are fixed up front
///
/// Receipt polls follow the per-nonce script (or the default script) and
/// report `Mined` once the script runs out.
pub struct ScriptedGateway {
    coinbase: Result<Address, GatewayError>,
    nonce: Result<U256, GatewayError>,
    send_delay: Duration,
    failing_sends: HashSet<u64>,
    panicking_sends: HashSet<u64>,
    default_script: Vec<Reply>,
    nonce_scripts: HashMap<u64, Vec<Reply>>,
    receipt_queues: Mutex<HashMap<H256, (u64, VecDeque<Reply>)>>,
    sent: Mutex<Vec<TransferRequest>>,
    coinbase_calls: AtomicUsize,
    count_calls: AtomicUsize,
    receipt_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(coinbase: Address, starting_nonce: u64) -> Self {
        Self {
            coinbase: Ok(coinbase),
            nonce: Ok(U256::from(starting_nonce)),
            send_delay: Duration::ZERO,
            failing_sends: HashSet::new(),
            panicking_sends: HashSet::new(),
            default_script: Vec::new(),
            nonce_scripts: HashMap::new(),
            receipt_queues: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            coinbase_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            receipt_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_coinbase_error(mut self, err: GatewayError) -> Self {
        self.coinbase = Err(err);
        self
    }

    pub fn with_nonce_error(mut self, err: GatewayError) -> Self {
        self.nonce = Err(err);
        self
    }

    pub fn with_raw_nonce(mut self, nonce: U256) -> Self {
        self.nonce = Ok(nonce);
        self
    }

    /// Hold every send for `delay` so tasks overlap
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn with_failing_send(mut self, nonce: u64) -> Self {
        self.failing_sends.insert(nonce);
        self
    }

    pub fn with_panicking_send(mut self, nonce: u64) -> Self {
        self.panicking_sends.insert(nonce);
        self
    }

    pub fn with_default_script(mut self, script: Vec<Reply>) -> Self {
        self.default_script = script;
        self
    }

    pub fn with_script_for(mut self, nonce: u64, script: Vec<Reply>) -> Self {
        self.nonce_scripts.insert(nonce, script);
        self
    }

    /// Register a hash directly, for awaiter tests that skip submission
    pub fn register(&self, nonce: u64, script: Vec<Reply>) -> H256 {
        let tx_hash = hash_for(nonce);
        self.receipt_queues
            .lock()
            .unwrap()
            .insert(tx_hash, (nonce, script.into()));
        tx_hash
    }

    pub fn sent(&self) -> Vec<TransferRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn coinbase_calls(&self) -> usize {
        self.coinbase_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn receipt_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcGateway for ScriptedGateway {
    async fn coinbase(&self) -> Result<Address, GatewayError> {
        self.coinbase_calls.fetch_add(1, Ordering::SeqCst);
        self.coinbase.clone()
    }

    async fn transaction_count(
        &self,
        _address: Address,
        _block: BlockNumber,
    ) -> Result<U256, GatewayError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.nonce.clone()
    }

    async fn send_transaction(&self, request: TransferRequest) -> Result<H256, GatewayError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self.panicking_sends.contains(&request.nonce) {
            panic!("scripted panic for nonce {}", request.nonce);
        }
        self.sent.lock().unwrap().push(request);

        if self.failing_sends.contains(&request.nonce) {
            return Err(GatewayError::rpc(-32000, "nonce too low"));
        }

        let script = self
            .nonce_scripts
            .get(&request.nonce)
            .unwrap_or(&self.default_script)
            .clone();
        Ok(self.register(request.nonce, script))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, GatewayError> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);

        let mut queues = self.receipt_queues.lock().unwrap();
        let Some((nonce, queue)) = queues.get_mut(&tx_hash) else {
            return Ok(None);
        };

        match queue.pop_front().unwrap_or(Reply::Mined) {
            Reply::Mined => Ok(Some(receipt(tx_hash, block_for(*nonce)))),
            Reply::Pending => Ok(None),
            Reply::Fail(err) => Err(err),
        }
    }
}
