//! 0x Swap API v1 payloads.
//!
//! https://0x.org/docs/0x-swap-api/api-references/get-swap-v1-price
//! https://0x.org/docs/0x-swap-api/api-references/get-swap-v1-quote

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::uint::{U256, opt_dec_str};

/// Query accepted by both `/swap/v1/price` and `/swap/v1/quote`.
/// Exactly one of `sell_amount` / `buy_amount` is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuery {
    pub sell_token: String,
    pub buy_token: String,
    #[serde(default, with = "opt_dec_str", skip_serializing_if = "Option::is_none")]
    pub sell_amount: Option<U256>,
    #[serde(default, with = "opt_dec_str", skip_serializing_if = "Option::is_none")]
    pub buy_amount: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taker_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    #[serde(default)]
    pub chain_id: Option<u32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub estimated_price_impact: Option<String>,
    #[serde(default, with = "opt_dec_str")]
    pub value: Option<U256>,
    #[serde(default, with = "opt_dec_str")]
    pub gas_price: Option<U256>,
    #[serde(default, with = "opt_dec_str")]
    pub gas: Option<U256>,
    #[serde(default, with = "opt_dec_str")]
    pub estimated_gas: Option<U256>,
    #[serde(default)]
    pub buy_token_address: Option<String>,
    #[serde(default, with = "opt_dec_str")]
    pub buy_amount: Option<U256>,
    #[serde(default)]
    pub sell_token_address: Option<String>,
    #[serde(default, with = "opt_dec_str")]
    pub sell_amount: Option<U256>,
    #[serde(default)]
    pub allowance_target: Option<String>,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
}

impl PriceResponse {
    /// A body with neither amount carries no pricing information.
    pub fn has_amounts(&self) -> bool {
        self.buy_amount.is_some() || self.sell_amount.is_some()
    }
}

/// Firm quote: the price fields plus a ready-to-sign transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub price: PriceResponse,
    pub to: String,
    pub data: String,
    #[serde(default)]
    pub guaranteed_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field: String,
    pub code: i64,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {} ({description})", self.field, self.reason),
            None => write!(f, "{}: {}", self.field, self.reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailure {
    pub code: i64,
    pub reason: String,
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ZeroXResponse {
    Quote(QuoteResponse),
    Failure(ApiFailure),
    Price(PriceResponse),
}
