//! Chain access used by the swap flow: reads go through a [`ChainReader`],
//! anything that needs a signature goes through a [`WalletSigner`].

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use error_stack::{ResultExt as _, report};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use swap_models::uint::{U256, opt_dec_str, parse_u256};
use tracing::{debug, info};

use crate::{
    config::Secret,
    error::{DappResult, Error},
    utils::abi::{allowance_calldata, balance_of_calldata, decode_uint256},
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Payload handed to the wallet for signing. Mirrors the firm quote
/// fields the swap submits unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(default, with = "opt_dec_str", skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, with = "opt_dec_str", skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(default, with = "opt_dec_str", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn erc20_allowance(&self, token: &str, owner: &str, spender: &str) -> DappResult<U256>;

    async fn erc20_balance(&self, token: &str, owner: &str) -> DappResult<U256>;

    async fn native_balance(&self, owner: &str) -> DappResult<U256>;

    /// Resolves once the transaction is mined, whatever its outcome.
    async fn wait_for_receipt(&self, tx_hash: &str) -> DappResult<TxReceipt>;
}

/// The connected wallet. Key management and signing live behind it.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> &str;

    /// Signs and broadcasts, returning the transaction hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> DappResult<String>;
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

impl RawReceipt {
    fn into_receipt(self) -> DappResult<TxReceipt> {
        let block_number = match self.block_number {
            Some(number) => Some(
                parse_u256(&number)
                    .change_context(Error::RpcError("Invalid block number".to_string()))?
                    .low_u64(),
            ),
            None => None,
        };
        Ok(TxReceipt {
            transaction_hash: self.transaction_hash,
            success: self.status.as_deref() == Some("0x1"),
            block_number,
        })
    }
}

/// Ethereum JSON-RPC reader over HTTP.
#[derive(Debug)]
pub struct RpcChainReader {
    client: reqwest::Client,
    rpc_url: Secret,
    poll_interval: Duration,
    receipt_timeout: Duration,
    next_id: AtomicU64,
}

impl RpcChainReader {
    pub fn new(client: reqwest::Client, rpc_url: Secret) -> Self {
        Self {
            client,
            rpc_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_receipt_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.receipt_timeout = timeout;
        self
    }

    async fn call(&self, method: &str, params: Value) -> DappResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.rpc_url.expose())
            .json(&body)
            .send()
            .await
            .change_context(Error::ReqwestError)
            .attach_printable_lazy(|| format!("Error sending {method}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(report!(Error::RpcError(format!(
                "{method} answered HTTP {status}"
            ))));
        }

        let rpc_response: RpcResponse = response
            .json()
            .await
            .change_context(Error::RpcError(format!("Invalid {method} response")))?;

        if let Some(error) = rpc_response.error {
            return Err(report!(Error::RpcError(format!(
                "{method} failed with {}: {}",
                error.code, error.message
            ))));
        }
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    async fn call_uint(&self, method: &str, params: Value) -> DappResult<U256> {
        match self.call(method, params).await? {
            Value::String(result) => decode_uint256(&result)
                .change_context(Error::RpcError(format!("Invalid {method} result"))),
            other => Err(report!(Error::RpcError(format!(
                "Unexpected {method} result: {other}"
            )))),
        }
    }

    async fn eth_call(&self, to: &str, data: String) -> DappResult<U256> {
        self.call_uint("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    pub async fn transaction_receipt(&self, tx_hash: &str) -> DappResult<Option<TxReceipt>> {
        match self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?
        {
            Value::Null => Ok(None),
            value => {
                let raw: RawReceipt = serde_json::from_value(value)
                    .change_context(Error::RpcError("Invalid receipt".to_string()))?;
                raw.into_receipt().map(Some)
            }
        }
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn erc20_allowance(&self, token: &str, owner: &str, spender: &str) -> DappResult<U256> {
        self.eth_call(token, allowance_calldata(owner, spender)?).await
    }

    async fn erc20_balance(&self, token: &str, owner: &str) -> DappResult<U256> {
        self.eth_call(token, balance_of_calldata(owner)?).await
    }

    async fn native_balance(&self, owner: &str) -> DappResult<U256> {
        self.call_uint("eth_getBalance", json!([owner, "latest"]))
            .await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> DappResult<TxReceipt> {
        let poll = async {
            loop {
                if let Some(receipt) = self.transaction_receipt(tx_hash).await? {
                    info!(
                        "Transaction {tx_hash} mined in block {:?}, success: {}",
                        receipt.block_number, receipt.success
                    );
                    return Ok::<_, error_stack::Report<Error>>(receipt);
                }
                debug!("Transaction {tx_hash} still pending");
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| {
                report!(Error::RpcError(format!(
                    "Timed out waiting for receipt of {tx_hash}"
                )))
            })?
    }
}
