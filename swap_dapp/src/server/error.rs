use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use error_stack::Report;
use serde_json::json;
use tracing::{error, warn};

use crate::error::{Error, ReportDisplayExt};

/// Report returned from a handler, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Report<Error>);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.current_context() {
            Error::SiweVerification(_) | Error::SessionError(_) => StatusCode::UNAUTHORIZED,
            Error::SiweMessage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ParseError | Error::ModelsError | Error::TokenNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::ReqwestError | Error::ResponseError | Error::AggregatorError(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Report<Error>> for ApiError {
    fn from(report: Report<Error>) -> Self {
        Self(report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self.0);
        } else {
            warn!("Request rejected ({status}): {}", self.0.format());
        }
        (status, Json(json!({ "error": self.0.format() }))).into_response()
    }
}
