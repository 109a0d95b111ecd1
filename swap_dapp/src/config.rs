use std::{fmt, net::SocketAddr, time::Duration};

use error_stack::{ResultExt, report};
use serde::Serialize;
use swap_models::{constants::chains::ChainId, log::LogFormat, network::RateLimitWindow};

use crate::{
    error::{DappResult, Error},
    swap::wallet::RpcChainReader,
};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24;

/// Credential loaded from the environment. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Clone)]
pub struct ZeroXConfig {
    pub api_url: String,
    pub api_key: Secret,
    pub rate_limit: Option<RateLimitWindow>,
}

/// Wallet/session context built once at start and handed to whatever
/// needs chain access.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub chain: ChainId,
    pub rpc_url: Secret,
    pub walletconnect_project_id: String,
    pub app: AppMetadata,
}

/// What the browser is allowed to see of [`WalletConfig`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicWalletConfig {
    pub chain_id: u32,
    pub chain_name: String,
    pub native_symbol: String,
    pub exchange_proxy: String,
    pub explorer_url: String,
    pub walletconnect_project_id: String,
    pub app: AppMetadata,
}

impl WalletConfig {
    /// JSON-RPC reader for the configured chain.
    pub fn chain_reader(&self, client: reqwest::Client) -> RpcChainReader {
        RpcChainReader::new(client, self.rpc_url.clone())
    }

    pub fn public(&self) -> PublicWalletConfig {
        PublicWalletConfig {
            chain_id: self.chain as u32,
            chain_name: self.chain.to_string(),
            native_symbol: self.chain.native_symbol().to_string(),
            exchange_proxy: self.chain.exchange_proxy().to_string(),
            explorer_url: self.chain.explorer_url().to_string(),
            walletconnect_project_id: self.walletconnect_project_id.clone(),
            app: self.app.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiweConfig {
    /// Expected `domain` of signed messages; any domain when unset
    pub domain: Option<String>,
    pub session_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    pub log_format: LogFormat,
    pub zero_x: ZeroXConfig,
    pub wallet: WalletConfig,
    pub siwe: SiweConfig,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> DappResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> DappResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = ["ZERO_X_API_KEY", "RPC_API_KEY", "WALLETCONNECT_PROJECT_ID"]
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(report!(Error::ConfigError(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            ))));
        }
        let zero_x_api_key = get("ZERO_X_API_KEY").unwrap_or_default();
        let rpc_api_key = get("RPC_API_KEY").unwrap_or_default();
        let walletconnect_project_id = get("WALLETCONNECT_PROJECT_ID").unwrap_or_default();

        let chain = match get("CHAIN_ID") {
            Some(value) => ChainId::try_from(value.as_str())
                .change_context(Error::ConfigError(format!("Unsupported CHAIN_ID {value}")))?,
            None => ChainId::Polygon,
        };

        let bind_address = get("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address
            .parse::<SocketAddr>()
            .change_context(Error::ConfigError(format!(
                "Invalid BIND_ADDRESS {bind_address}"
            )))?;

        let rate_limit = match get("ZERO_X_RATE_LIMIT") {
            Some(value) => Some(RateLimitWindow::from_string(&value).ok_or_else(|| {
                report!(Error::ConfigError(format!(
                    "Invalid ZERO_X_RATE_LIMIT {value}, expected <n>s|m|h|d"
                )))
            })?),
            None => None,
        };

        let session_ttl_secs = match get("SIWE_SESSION_TTL_SECS") {
            Some(value) => value.parse::<u64>().change_context(Error::ConfigError(format!(
                "Invalid SIWE_SESSION_TTL_SECS {value}"
            )))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let rpc_url = get("RPC_URL").unwrap_or_else(|| chain.alchemy_rpc_url(&rpc_api_key));

        Ok(Self {
            bind_address,
            log_format: LogFormat::from_env_value(get("LOG_FORMAT").as_deref()),
            zero_x: ZeroXConfig {
                api_url: get("ZERO_X_API_URL")
                    .unwrap_or_else(|| chain.zero_x_api_url().to_string()),
                api_key: Secret::new(zero_x_api_key),
                rate_limit,
            },
            wallet: WalletConfig {
                chain,
                rpc_url: Secret::new(rpc_url),
                walletconnect_project_id,
                app: AppMetadata {
                    name: get("APP_NAME").unwrap_or_else(|| "Exchange App".to_string()),
                    description: get("APP_DESCRIPTION").unwrap_or_default(),
                    url: get("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
                    icon: get("APP_ICON").unwrap_or_default(),
                },
            },
            siwe: SiweConfig {
                domain: get("SIWE_DOMAIN"),
                session_ttl: Duration::from_secs(session_ttl_secs),
            },
        })
    }
}
