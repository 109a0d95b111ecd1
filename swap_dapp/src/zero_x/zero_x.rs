use async_trait::async_trait;
use error_stack::ResultExt as _;
use swap_models::{
    models::zero_x::{QuoteResponse, SwapQuery, ZeroXResponse},
    network::{
        client_rate_limit::Client,
        http::{RelayedResponse, relay_json_response, value_to_sorted_querystring},
    },
};
use tracing::{debug, warn};

use crate::{
    config::{Secret, ZeroXConfig},
    error::{DappResult, Error, ReportDisplayExt},
    swap::quotes::{QuoteSource, quote_from_response},
    zero_x::{ZERO_X_API_KEY_HEADER, ZERO_X_SWAP_PATH, ZeroXEndpoint},
};

/// Server-side 0x client. Holds the API key; nothing it returns ever
/// contains it.
#[derive(Debug, Clone)]
pub struct ZeroXClient {
    client: Client,
    api_url: String,
    api_key: Secret,
}

impl ZeroXClient {
    pub fn new(client: Client, api_url: impl Into<String>, api_key: Secret) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &ZeroXConfig) -> DappResult<Self> {
        let client = Client::from_window(reqwest::Client::new(), config.rate_limit, None)
            .change_context(Error::ModelsError)
            .attach_printable("Error building 0x HTTP client")?;
        Ok(Self::new(client, config.api_url.clone(), config.api_key.clone()))
    }

    pub fn endpoint_url(&self, endpoint: ZeroXEndpoint, raw_query: Option<&str>) -> String {
        let base = format!("{}/{ZERO_X_SWAP_PATH}/{}", self.api_url, endpoint.path());
        match raw_query {
            Some(query) if !query.is_empty() => format!("{base}?{query}"),
            _ => base,
        }
    }

    /// Sends the caller's query string untouched and hands back whatever
    /// status and JSON the upstream produced.
    pub async fn forward(
        &self,
        endpoint: ZeroXEndpoint,
        raw_query: Option<&str>,
    ) -> DappResult<RelayedResponse> {
        let url = self.endpoint_url(endpoint, raw_query);
        debug!("Forwarding 0x {} request", endpoint.path());

        let request = self
            .client
            .inner_client()
            .get(&url)
            .header(ZERO_X_API_KEY_HEADER, self.api_key.expose())
            .build()
            .change_context(Error::ReqwestError)
            .attach_printable("Error building 0x request")?;

        let response = self
            .client
            .execute(request)
            .await
            .change_context(Error::ReqwestError)
            .attach_printable("Error in 0x request")?;

        relay_json_response(response)
            .await
            .change_context(Error::ResponseError)
    }

    async fn fetch(&self, endpoint: ZeroXEndpoint, query: &SwapQuery) -> DappResult<ZeroXResponse> {
        let value = serde_json::to_value(query).change_context(Error::ParseError)?;
        let query_string = value_to_sorted_querystring(&value).change_context(Error::ParseError)?;
        let relayed = self.forward(endpoint, Some(&query_string)).await?;

        serde_json::from_value(relayed.body)
            .change_context(Error::ResponseError)
            .attach_printable_lazy(|| format!("Unexpected 0x {} body", endpoint.path()))
    }

    pub async fn get_price(&self, query: &SwapQuery) -> DappResult<ZeroXResponse> {
        self.fetch(ZeroXEndpoint::Price, query).await
    }

    pub async fn get_quote(&self, query: &SwapQuery) -> DappResult<ZeroXResponse> {
        self.fetch(ZeroXEndpoint::Quote, query).await
    }
}

#[async_trait]
impl QuoteSource for ZeroXClient {
    async fn price(&self, query: &SwapQuery) -> Option<ZeroXResponse> {
        match self.get_price(query).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("0x price request failed: {}", e.format());
                None
            }
        }
    }

    async fn quote(&self, query: &SwapQuery) -> DappResult<QuoteResponse> {
        let response = self.get_quote(query).await?;
        quote_from_response(response)
    }
}
