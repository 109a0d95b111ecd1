use axum::{
    Json,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{error::ReportDisplayExt, server::AppState, zero_x::ZeroXEndpoint};

async fn relay(state: &AppState, endpoint: ZeroXEndpoint, query: Option<String>) -> Response {
    match state.zero_x.forward(endpoint, query.as_deref()).await {
        Ok(relayed) => {
            let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(relayed.body)).into_response()
        }
        Err(e) => {
            error!("0x {} proxy failed: {}", endpoint.path(), e.format());
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

pub async fn price(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    relay(&state, ZeroXEndpoint::Price, query).await
}

pub async fn quote(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    relay(&state, ZeroXEndpoint::Quote, query).await
}
