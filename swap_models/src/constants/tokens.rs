use std::collections::HashMap;

use error_stack::{ResultExt, report};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::chains::{ChainId, is_evm_address, is_native_token_evm_address};
use crate::error::{Error, ModelResult};

const POLYGON_TOKEN_LIST_JSON: &str = include_str!("../../assets/polygon_token_list.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u32>,
    pub name: String,
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "logoURI")]
    pub logo_uri: String,
}

impl Token {
    /// Registry key and selector value
    pub fn key(&self) -> String {
        self.symbol.to_lowercase()
    }

    pub fn is_native(&self) -> bool {
        is_native_token_evm_address(&self.address)
    }
}

#[derive(Debug, Deserialize)]
struct TokenListFile {
    tokens: Vec<Token>,
}

fn polygon_token(name: &str, symbol: &str, decimals: u8, address: &str, logo: &str) -> Token {
    Token {
        chain_id: Some(ChainId::Polygon as u32),
        name: name.to_string(),
        address: address.to_string(),
        symbol: symbol.to_string(),
        decimals,
        logo_uri: format!(
            "https://raw.githubusercontent.com/maticnetwork/polygon-token-assets/main/assets/tokenAssets/{logo}.svg"
        ),
    }
}

lazy_static::lazy_static! {
    pub static ref POLYGON_TOKENS: Vec<Token> = vec![
        polygon_token("Wrapped Matic", "WMATIC", 18, "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270", "matic"),
        polygon_token("USD Coin", "USDC", 6, "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "usdc"),
        polygon_token("Dai - PoS", "DAI", 18, "0x8f3cf7ad23cd3cadbd9735aff958023239c6a063", "dai"),
    ];
}

/// Static token metadata keyed by lowercase symbol.
///
/// The primary list is always shown; the extended list is only offered
/// after the user asks for more options. The lookup covers both lists,
/// a symbol present in both resolves to the extended entry.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    primary: Vec<Token>,
    extended: Vec<Token>,
    by_symbol: HashMap<String, Token>,
}

impl TokenRegistry {
    pub fn new(primary: Vec<Token>, extended: Vec<Token>) -> ModelResult<Self> {
        let mut by_symbol = HashMap::with_capacity(primary.len() + extended.len());
        for token in primary.iter().chain(extended.iter()) {
            if token.symbol.trim().is_empty() {
                return Err(report!(Error::TokenListError(format!(
                    "Token at {} has an empty symbol",
                    token.address
                ))));
            }
            if !is_evm_address(&token.address) {
                return Err(report!(Error::TokenListError(format!(
                    "Token {} has an invalid address {}",
                    token.symbol, token.address
                ))));
            }
            if let Some(previous) = by_symbol.insert(token.key(), token.clone()) {
                debug!(
                    "Token symbol {} listed twice, {} replaces {}",
                    token.symbol, token.address, previous.address
                );
            }
        }

        Ok(Self {
            primary,
            extended,
            by_symbol,
        })
    }

    /// Builds a registry from a primary list and a token-list JSON document
    /// (`{"tokens": [...]}`) for the extended list.
    pub fn from_token_list_json(primary: Vec<Token>, token_list_json: &str) -> ModelResult<Self> {
        let list: TokenListFile = serde_json::from_str(token_list_json)
            .change_context(Error::SerdeDeserialize(
                "Failed to parse token list".to_string(),
            ))?;
        Self::new(primary, list.tokens)
    }

    pub fn polygon() -> ModelResult<Self> {
        Self::from_token_list_json(POLYGON_TOKENS.clone(), POLYGON_TOKEN_LIST_JSON)
    }

    pub fn get(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(&symbol.to_lowercase())
    }

    pub fn require(&self, symbol: &str) -> ModelResult<&Token> {
        self.get(symbol)
            .ok_or_else(|| report!(Error::TokenNotFound(symbol.to_string())))
    }

    pub fn find_by_address(&self, address: &str) -> Option<&Token> {
        self.by_symbol
            .values()
            .find(|token| token.address.eq_ignore_ascii_case(address))
    }

    pub fn primary(&self) -> &[Token] {
        &self.primary
    }

    pub fn extended(&self) -> &[Token] {
        &self.extended
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
