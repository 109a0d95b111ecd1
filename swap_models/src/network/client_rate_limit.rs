use error_stack::report;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter, clock::DefaultClock};
use reqwest::{Client as ReqwestClient, Error as ReqwestError, Request, Response};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{Error, ModelResult};
use crate::network::RateLimitWindow;

/// HTTP client for upstream APIs, optionally throttled by a local quota.
#[derive(Debug, Clone)]
pub enum Client {
    RateLimited(RateLimitedClient),
    Unrestricted(ReqwestClient),
}

impl Client {
    pub fn from_window(
        inner: ReqwestClient,
        window: Option<RateLimitWindow>,
        burst: Option<NonZeroU32>,
    ) -> ModelResult<Self> {
        match window {
            Some(window) => Ok(Client::RateLimited(RateLimitedClient::new(
                inner, window, burst,
            )?)),
            None => Ok(Client::Unrestricted(inner)),
        }
    }

    pub async fn execute(&self, req: Request) -> Result<Response, ReqwestError> {
        match self {
            Client::RateLimited(rate_limited_client) => rate_limited_client.execute(req).await,
            Client::Unrestricted(unrestricted_client) => unrestricted_client.execute(req).await,
        }
    }

    pub fn inner_client(&self) -> &ReqwestClient {
        match self {
            Client::RateLimited(rate_limited_client) => rate_limited_client.inner_client(),
            Client::Unrestricted(unrestricted_client) => unrestricted_client,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Client::RateLimited(_))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    inner: ReqwestClient,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimitedClient {
    pub fn new(
        inner: ReqwestClient,
        limit: RateLimitWindow,
        burst: Option<NonZeroU32>,
    ) -> ModelResult<Self> {
        let mut quota = match limit {
            RateLimitWindow::PerSecond(allowed) => Quota::per_second(allowed),
            RateLimitWindow::PerMinute(allowed) => Quota::per_minute(allowed),
            RateLimitWindow::Custom { period } => Quota::with_period(period).ok_or_else(|| {
                report!(Error::RateLimitError(format!(
                    "Quota period must be non-zero, got {period:?}"
                )))
            })?,
        };
        if let Some(burst) = burst {
            quota = quota.allow_burst(burst);
        }

        Ok(Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn inner_client(&self) -> &ReqwestClient {
        &self.inner
    }

    /// Waits for a permit, then sends the request.
    pub async fn execute(&self, req: Request) -> Result<Response, ReqwestError> {
        self.limiter.until_ready().await;
        self.inner.execute(req).await
    }
}
