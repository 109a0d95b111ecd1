pub mod error;
pub mod proxy;
pub mod siwe;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use error_stack::ResultExt as _;
use serde::Deserialize;
use swap_models::constants::chains::ChainId;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{
    account::AccountSummary,
    config::{AppConfig, PublicWalletConfig, SiweConfig},
    error::{DappResult, Error},
    server::error::ApiError,
    siwe::session::SessionStore,
    swap::wallet::ChainReader,
    zero_x::zero_x::ZeroXClient,
};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub zero_x: Arc<ZeroXClient>,
    pub sessions: Arc<SessionStore>,
    pub chain: ChainId,
    pub chain_reader: Arc<dyn ChainReader>,
    pub siwe: SiweConfig,
    pub wallet: PublicWalletConfig,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> DappResult<Self> {
        Ok(Self {
            zero_x: Arc::new(ZeroXClient::from_config(&config.zero_x)?),
            sessions: Arc::new(SessionStore::new(config.siwe.session_ttl)),
            chain: config.wallet.chain,
            chain_reader: Arc::new(config.wallet.chain_reader(reqwest::Client::new())),
            siwe: config.siwe.clone(),
            wallet: config.wallet.public(),
        })
    }
}

async fn wallet_config(State(state): State<AppState>) -> Json<PublicWalletConfig> {
    Json(state.wallet)
}

#[derive(Debug, Deserialize)]
struct AccountQuery {
    address: Option<String>,
}

/// Account panel data for `?address=`, "not connected" without one.
async fn account(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Result<Json<AccountSummary>, ApiError> {
    let summary =
        AccountSummary::load(&*state.chain_reader, query.address.as_deref(), state.chain).await?;
    Ok(Json(summary))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/price", get(proxy::price))
        .route("/api/quote", get(proxy::quote))
        .route(
            "/api/siwe",
            get(siwe::session)
                .put(siwe::nonce)
                .post(siwe::verify)
                .delete(siwe::sign_out),
        )
        .route("/api/wallet-config", get(wallet_config))
        .route("/api/account", get(account))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_session_purge(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                debug!("Purged {purged} expired sign-in sessions");
            }
        }
    });
}

/// Binds `config.bind_address` and serves until the process stops.
pub async fn serve(config: AppConfig) -> DappResult<()> {
    let state = AppState::from_config(&config)?;
    spawn_session_purge(state.sessions.clone());

    let listener = TcpListener::bind(config.bind_address)
        .await
        .change_context(Error::ServerError("Failed to bind".to_string()))
        .attach_printable_lazy(|| config.bind_address.to_string())?;
    info!(
        "Serving {} swap API on {}",
        state.wallet.chain_name, config.bind_address
    );

    axum::serve(listener, router(state))
        .await
        .change_context(Error::ServerError("Server stopped".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppMetadata, Secret, WalletConfig},
        siwe::verify::tests::{message_for, sign, signing_key},
        tests::spawn_server,
    };
    use axum::{
        extract::RawQuery,
        http::{HeaderMap, StatusCode},
    };
    use chrono::Utc;
    use reqwest::header::{COOKIE, SET_COOKIE};
    use serde_json::{Value, json};
    use swap_models::network::client_rate_limit::Client;

    const RPC_SECRET_URL: &str = "https://polygon-mainnet.g.alchemy.com/v2/rpc-secret";

    fn state(upstream_url: &str) -> AppState {
        state_with_rpc(upstream_url, RPC_SECRET_URL)
    }

    fn state_with_rpc(upstream_url: &str, rpc_url: &str) -> AppState {
        let wallet = WalletConfig {
            chain: ChainId::Polygon,
            rpc_url: Secret::new(rpc_url),
            walletconnect_project_id: "wc-project".to_string(),
            app: AppMetadata {
                name: "Exchange App".to_string(),
                description: String::new(),
                url: "https://swap.example".to_string(),
                icon: String::new(),
            },
        };
        AppState {
            zero_x: Arc::new(ZeroXClient::new(
                Client::Unrestricted(reqwest::Client::new()),
                upstream_url,
                Secret::new("zero-x-secret"),
            )),
            sessions: Arc::new(SessionStore::new(Duration::from_secs(600))),
            chain: wallet.chain,
            chain_reader: Arc::new(wallet.chain_reader(reqwest::Client::new())),
            siwe: SiweConfig {
                domain: Some("swap.example".to_string()),
                session_ttl: Duration::from_secs(600),
            },
            wallet: wallet.public(),
        }
    }

    async fn echo(headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
        Json(json!({
            "query": query,
            "apiKey": headers.get("0x-api-key").and_then(|v| v.to_str().ok()),
        }))
    }

    async fn spawn_app(upstream_url: &str) -> String {
        spawn_server(router(state(upstream_url))).await
    }

    fn cookie_pair(response: &reqwest::Response) -> String {
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_price_forwards_query_verbatim_with_key() {
        let upstream = spawn_server(Router::new().route("/swap/v1/price", get(echo))).await;
        let app = spawn_app(&upstream).await;

        let response = reqwest::get(format!(
            "{app}/api/price?sellToken=WMATIC&buyToken=USDC&sellAmount=1000000000000000000"
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["query"],
            "sellToken=WMATIC&buyToken=USDC&sellAmount=1000000000000000000"
        );
        assert_eq!(body["apiKey"], "zero-x-secret");
    }

    #[tokio::test]
    async fn test_quote_relays_upstream_status() {
        let upstream = spawn_server(Router::new().route(
            "/swap/v1/quote",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"code": 100, "reason": "Validation Failed"})),
                )
            }),
        ))
        .await;
        let app = spawn_app(&upstream).await;

        let response = reqwest::get(format!("{app}/api/quote?sellToken=a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["reason"], "Validation Failed");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway_with_empty_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let app = spawn_app(&format!("http://{addr}")).await;

        let response = reqwest::get(format!("{app}/api/price?sellToken=a"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_config_has_no_secrets() {
        let app = spawn_app("http://127.0.0.1:9").await;
        let response = reqwest::get(format!("{app}/api/wallet-config")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let text = response.text().await.unwrap();
        assert!(!text.contains("rpc-secret"));
        assert!(!text.contains("zero-x-secret"));
        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["chainId"], 137);
        assert_eq!(body["walletconnectProjectId"], "wc-project");
    }

    #[tokio::test]
    async fn test_account_reads_balance_over_rpc() {
        let rpc = spawn_server(Router::new().route(
            "/",
            axum::routing::post(|Json(body): Json<Value>| async move {
                assert_eq!(body["method"], "eth_getBalance");
                Json(json!({"jsonrpc": "2.0", "id": body["id"], "result": "0x1bc16d674ec80000"}))
            }),
        ))
        .await;
        let app = spawn_server(router(state_with_rpc("http://127.0.0.1:9", &rpc))).await;

        let body: Value = reqwest::get(format!(
            "{app}/api/account?address=0x9ecdc9af2a8254dde8bbce8778efae695044cc9f"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(body["connected"], true);
        assert_eq!(body["balance"], "2");
        assert_eq!(body["symbol"], "MATIC");
        assert_eq!(body["chainId"], 137);

        let body: Value = reqwest::get(format!("{app}/api/account"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["connected"], false);

        let response = reqwest::get(format!("{app}/api/account?address=0xnothex"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_in_flow() {
        let app = spawn_app("http://127.0.0.1:9").await;
        let http = reqwest::Client::new();
        let url = format!("{app}/api/siwe");

        let response = http.put(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(&response);
        let nonce = response.text().await.unwrap();
        assert!(nonce.len() >= 8);

        let key = signing_key(0x42);
        let message = message_for(&key, &nonce, Utc::now());
        let signature = sign(&key, &message);

        let response = http
            .post(&url)
            .header(COOKIE, &cookie)
            .json(&json!({"message": message, "signature": signature}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let identity: Value = response.json().await.unwrap();
        assert_eq!(identity["chainId"], 137);

        let session: Value = http
            .get(&url)
            .header(COOKIE, &cookie)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session, identity);

        // the nonce is single use
        let replay = http
            .post(&url)
            .header(COOKIE, &cookie)
            .json(&json!({"message": message, "signature": signature}))
            .send()
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

        let response = http.delete(&url).header(COOKIE, &cookie).send().await.unwrap();
        assert!(cookie_pair(&response).ends_with('='));
        let session: Value = http
            .get(&url)
            .header(COOKIE, &cookie)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session, json!({}));
    }

    #[tokio::test]
    async fn test_sign_in_rejects_wrong_nonce_and_bad_body() {
        let app = spawn_app("http://127.0.0.1:9").await;
        let http = reqwest::Client::new();
        let url = format!("{app}/api/siwe");

        let response = http.put(&url).send().await.unwrap();
        let cookie = cookie_pair(&response);

        let key = signing_key(0x42);
        let message = message_for(&key, "someothernonce1", Utc::now());
        let signature = sign(&key, &message);
        let response = http
            .post(&url)
            .header(COOKIE, &cookie)
            .json(&json!({"message": message, "signature": signature}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Nonce mismatch"));

        let response = http
            .post(&url)
            .header(COOKIE, &cookie)
            .body("{\"message\": 1")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = http
            .post(&url)
            .json(&json!({"message": message, "signature": signature}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
