use serde::Serialize;
use swap_models::constants::chains::ChainId;
use tracing::warn;

use crate::{
    error::{DappResult, ReportDisplayExt},
    swap::wallet::ChainReader,
    utils::{abi::to_checksum_address, number_conversion::format_units},
};

const NATIVE_DECIMALS: u8 = 18;

/// What the account panel shows for the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub connected: bool,
    pub address: Option<String>,
    /// Native balance, formatted; `None` when it could not be read
    pub balance: Option<String>,
    pub symbol: String,
    pub chain_name: String,
    pub chain_id: u32,
}

impl AccountSummary {
    pub async fn load(
        reader: &dyn ChainReader,
        wallet_address: Option<&str>,
        chain: ChainId,
    ) -> DappResult<Self> {
        let mut summary = Self {
            connected: false,
            address: None,
            balance: None,
            symbol: chain.native_symbol().to_string(),
            chain_name: chain.to_string(),
            chain_id: chain as u32,
        };
        let Some(address) = wallet_address else {
            return Ok(summary);
        };

        summary.connected = true;
        summary.address = Some(to_checksum_address(address)?);
        summary.balance = match reader.native_balance(address).await {
            Ok(balance) => Some(format_units(balance, NATIVE_DECIMALS)),
            Err(e) => {
                warn!("Could not read balance of {address}: {}", e.format());
                None
            }
        };
        Ok(summary)
    }

    pub fn lines(&self) -> Vec<String> {
        if !self.connected {
            return vec!["Not connected".to_string()];
        }
        let mut lines = Vec::with_capacity(3);
        if let Some(address) = &self.address {
            lines.push(address.clone());
        }
        if let Some(balance) = &self.balance {
            lines.push(format!("Balance: {balance} {}", self.symbol));
        }
        lines.push(format!("{}, chainId: {}", self.chain_name, self.chain_id));
        lines
    }
}
