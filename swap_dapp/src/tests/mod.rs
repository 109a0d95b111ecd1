use std::sync::Mutex;

use async_trait::async_trait;
use error_stack::report;
use swap_models::{
    models::zero_x::{QuoteResponse, SwapQuery, ZeroXResponse},
    uint::U256,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    error::{DappResult, Error},
    swap::{
        quotes::QuoteSource,
        wallet::{ChainReader, TransactionRequest, TxReceipt, WalletSigner},
    },
};

pub const USER_ADDRESS: &str = "0x9ecdc9af2a8254dde8bbce8778efae695044cc9f";

/// Serves `router` on an ephemeral local port, returning its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn init_tracing_in_tests() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().pretty().with_ansi(true))
        .try_init()
        .ok();
}

#[derive(Default)]
pub struct MockQuoteSource {
    pub price: Mutex<Option<ZeroXResponse>>,
    pub quote: Mutex<Option<QuoteResponse>>,
    pub price_queries: Mutex<Vec<SwapQuery>>,
    pub quote_queries: Mutex<Vec<SwapQuery>>,
}

impl MockQuoteSource {
    pub fn set_price(&self, response: Option<ZeroXResponse>) {
        *self.price.lock().unwrap() = response;
    }

    pub fn set_quote(&self, quote: Option<QuoteResponse>) {
        *self.quote.lock().unwrap() = quote;
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn price(&self, query: &SwapQuery) -> Option<ZeroXResponse> {
        self.price_queries.lock().unwrap().push(query.clone());
        self.price.lock().unwrap().clone()
    }

    async fn quote(&self, query: &SwapQuery) -> DappResult<QuoteResponse> {
        self.quote_queries.lock().unwrap().push(query.clone());
        self.quote
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| report!(Error::AggregatorError("No quote".to_string())))
    }
}

/// In-memory chain. A mined transaction can bump the allowance to
/// `allowance_after_receipt`, the way an approval would.
pub struct MockChainReader {
    pub allowance: Mutex<U256>,
    pub balance: Mutex<U256>,
    pub native_balance: U256,
    pub receipt_success: Mutex<bool>,
    pub allowance_after_receipt: Mutex<Option<U256>>,
    pub allowance_reads: Mutex<Vec<(String, String, String)>>,
    /// When set, every balance and allowance read fails with this message
    pub read_error: Mutex<Option<String>>,
}

impl MockChainReader {
    pub fn new(allowance: U256, balance: U256) -> Self {
        Self {
            allowance: Mutex::new(allowance),
            balance: Mutex::new(balance),
            native_balance: U256::exp10(18),
            receipt_success: Mutex::new(true),
            allowance_after_receipt: Mutex::new(None),
            allowance_reads: Mutex::new(Vec::new()),
            read_error: Mutex::new(None),
        }
    }

    fn check_read(&self) -> DappResult<()> {
        match self.read_error.lock().unwrap().clone() {
            Some(message) => Err(report!(Error::RpcError(message))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn erc20_allowance(&self, token: &str, owner: &str, spender: &str) -> DappResult<U256> {
        self.allowance_reads.lock().unwrap().push((
            token.to_string(),
            owner.to_string(),
            spender.to_string(),
        ));
        self.check_read()?;
        Ok(*self.allowance.lock().unwrap())
    }

    async fn erc20_balance(&self, _token: &str, _owner: &str) -> DappResult<U256> {
        self.check_read()?;
        Ok(*self.balance.lock().unwrap())
    }

    async fn native_balance(&self, _owner: &str) -> DappResult<U256> {
        self.check_read()?;
        Ok(self.native_balance)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> DappResult<TxReceipt> {
        if let Some(allowance) = self.allowance_after_receipt.lock().unwrap().take() {
            *self.allowance.lock().unwrap() = allowance;
        }
        Ok(TxReceipt {
            transaction_hash: tx_hash.to_string(),
            success: *self.receipt_success.lock().unwrap(),
            block_number: Some(1),
        })
    }
}

pub struct MockWallet {
    pub address: String,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub reject_with: Mutex<Option<String>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            address: USER_ADDRESS.to_string(),
            sent: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> DappResult<String> {
        if let Some(reason) = self.reject_with.lock().unwrap().clone() {
            return Err(report!(Error::WalletError(reason)));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(format!("0x{:064x}", sent.len()))
    }
}
