use std::sync::Arc;

use swap_models::constants::{chains::ChainId, tokens::TokenRegistry};

use crate::{
    config::WalletConfig,
    swap::{
        quotes::QuoteSource,
        wallet::{ChainReader, WalletSigner},
    },
};

/// Switches between the dialog variants instead of keeping copies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SwapFeatures {
    /// Lets the user type the buy amount and price the trade from it.
    pub allow_buy_amount_entry: bool,
    /// Forwarded as `slippagePercentage` when set, e.g. `0.01` for 1%.
    pub slippage_percentage: Option<f64>,
}

/// Everything a swap dialog needs from the outside, passed in once.
#[derive(Clone)]
pub struct SwapContext {
    pub chain: ChainId,
    pub registry: Arc<TokenRegistry>,
    pub quotes: Arc<dyn QuoteSource>,
    pub chain_reader: Arc<dyn ChainReader>,
    /// `None` while no wallet is connected
    pub wallet: Option<Arc<dyn WalletSigner>>,
    pub features: SwapFeatures,
}

impl SwapContext {
    pub fn new(
        chain: ChainId,
        registry: Arc<TokenRegistry>,
        quotes: Arc<dyn QuoteSource>,
        chain_reader: Arc<dyn ChainReader>,
    ) -> Self {
        Self {
            chain,
            registry,
            quotes,
            chain_reader,
            wallet: None,
            features: SwapFeatures::default(),
        }
    }

    /// Context for the configured chain, reading through its RPC endpoint.
    pub fn from_config(
        wallet: &WalletConfig,
        registry: Arc<TokenRegistry>,
        quotes: Arc<dyn QuoteSource>,
        client: reqwest::Client,
    ) -> Self {
        Self::new(
            wallet.chain,
            registry,
            quotes,
            Arc::new(wallet.chain_reader(client)),
        )
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletSigner>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn with_features(mut self, features: SwapFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn wallet_address(&self) -> Option<String> {
        self.wallet.as_ref().map(|wallet| wallet.address().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppMetadata, Secret},
        tests::{MockQuoteSource, USER_ADDRESS, spawn_server},
    };
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};
    use swap_models::uint::U256;

    #[tokio::test]
    async fn test_from_config_reads_through_configured_rpc() {
        let rpc = spawn_server(Router::new().route(
            "/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["params"][0], USER_ADDRESS);
                Json(json!({"jsonrpc": "2.0", "id": body["id"], "result": "0x64"}))
            }),
        ))
        .await;
        let wallet = WalletConfig {
            chain: ChainId::Polygon,
            rpc_url: Secret::new(rpc),
            walletconnect_project_id: "wc-project".to_string(),
            app: AppMetadata {
                name: "Exchange App".to_string(),
                description: String::new(),
                url: "http://localhost:3000".to_string(),
                icon: String::new(),
            },
        };

        let ctx = SwapContext::from_config(
            &wallet,
            Arc::new(TokenRegistry::polygon().unwrap()),
            Arc::new(MockQuoteSource::default()),
            reqwest::Client::new(),
        );
        assert_eq!(ctx.chain, ChainId::Polygon);
        assert!(ctx.wallet_address().is_none());
        assert_eq!(
            ctx.chain_reader.native_balance(USER_ADDRESS).await.unwrap(),
            U256::from(100u64)
        );
    }
}
