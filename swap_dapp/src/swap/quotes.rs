use async_trait::async_trait;
use error_stack::{ResultExt as _, report};
use reqwest::StatusCode;
use swap_models::{
    models::zero_x::{QuoteResponse, SwapQuery, ZeroXResponse},
    network::http::value_to_sorted_querystring,
};
use tracing::warn;

use crate::error::{DappResult, Error, ReportDisplayExt};

/// Where the controller gets prices and firm quotes from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Indicative price. `None` means nothing usable came back and the
    /// caller keeps waiting.
    async fn price(&self, query: &SwapQuery) -> Option<ZeroXResponse>;

    async fn quote(&self, query: &SwapQuery) -> DappResult<QuoteResponse>;
}

/// Accepts only a signable quote. Validation failures become an
/// `AggregatorError` carrying the upstream messages.
pub fn quote_from_response(response: ZeroXResponse) -> DappResult<QuoteResponse> {
    match response {
        ZeroXResponse::Quote(quote) => Ok(quote),
        ZeroXResponse::Failure(failure) => {
            let mut report = report!(Error::AggregatorError(failure.reason.clone()));
            for validation_error in &failure.validation_errors {
                report = report.attach_printable(validation_error.to_string());
            }
            Err(report)
        }
        ZeroXResponse::Price(_) => Err(report!(Error::AggregatorError(
            "Quote response has no transaction payload".to_string()
        ))),
    }
}

/// Calls this service's own `/api/price` and `/api/quote` routes, the
/// way the browser does.
#[derive(Debug, Clone)]
pub struct ProxyQuoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyQuoteSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, route: &str, query: &SwapQuery) -> DappResult<String> {
        let value = serde_json::to_value(query).change_context(Error::ParseError)?;
        let query_string = value_to_sorted_querystring(&value).change_context(Error::ParseError)?;
        Ok(format!("{}/api/{route}?{query_string}", self.base_url))
    }

    async fn get(&self, route: &str, query: &SwapQuery) -> DappResult<Option<ZeroXResponse>> {
        let url = self.url(route, query)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .change_context(Error::ReqwestError)
            .attach_printable_lazy(|| format!("Error calling /api/{route}"))?;

        if response.status() == StatusCode::BAD_GATEWAY {
            return Ok(None);
        }
        let body = response
            .bytes()
            .await
            .change_context(Error::ResponseError)?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .change_context(Error::ResponseError)
            .attach_printable_lazy(|| format!("Unexpected /api/{route} body"))
    }
}

#[async_trait]
impl QuoteSource for ProxyQuoteSource {
    async fn price(&self, query: &SwapQuery) -> Option<ZeroXResponse> {
        match self.get("price", query).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Price request failed: {}", e.format());
                None
            }
        }
    }

    async fn quote(&self, query: &SwapQuery) -> DappResult<QuoteResponse> {
        match self.get("quote", query).await? {
            Some(response) => quote_from_response(response),
            None => Err(report!(Error::AggregatorError(
                "Quote service unavailable".to_string()
            ))),
        }
    }
}
