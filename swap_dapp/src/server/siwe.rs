use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use error_stack::{ResultExt as _, report};
use serde::Deserialize;
use serde_json::json;
use swap_models::network::JsonBodyLimits;
use tracing::info;

use crate::{
    error::Error,
    server::{AppState, error::ApiError},
    siwe::{
        SESSION_COOKIE,
        session::SiweIdentity,
        verify::{Expectations, verify_message},
    },
};

#[derive(Debug, Deserialize)]
struct SignInRequest {
    message: String,
    signature: String,
}

/// Value of the session cookie in a `Cookie` header, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(session_id: &str, max_age_secs: u64) -> String {
    format!("{SESSION_COOKIE}={session_id}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}")
}

/// PUT: starts (or refreshes) a session and returns its nonce as text.
pub async fn nonce(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session_id, nonce) = state.sessions.issue_nonce(session_id(&headers).as_deref());
    let cookie = session_cookie(&session_id, state.siwe.session_ttl.as_secs());
    ([(header::SET_COOKIE, cookie)], nonce).into_response()
}

/// POST: verifies a signed message against the session nonce.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SiweIdentity>, ApiError> {
    let request: SignInRequest = JsonBodyLimits::default()
        .parse(&body)
        .change_context(Error::ParseError)
        .attach_printable("Invalid sign-in body")?;

    let session_id = session_id(&headers)
        .ok_or_else(|| report!(Error::SessionError("No session cookie".to_string())))?;
    let nonce = state
        .sessions
        .nonce(&session_id)
        .ok_or_else(|| report!(Error::SessionError("No pending nonce".to_string())))?;

    let expected = Expectations {
        nonce: &nonce,
        domain: state.siwe.domain.as_deref(),
        chain_id: Some(u64::from(state.wallet.chain_id)),
        now: Utc::now(),
    };
    let message = verify_message(&request.message, &request.signature, &expected)?;

    let identity = SiweIdentity {
        address: message.address,
        chain_id: message.chain_id,
    };
    state
        .sessions
        .complete_sign_in(&session_id, &nonce, identity.clone())?;
    info!("Signed in {} on chain {}", identity.address, identity.chain_id);
    Ok(Json(identity))
}

/// GET: the signed-in identity, or `{}`.
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_id(&headers).and_then(|id| state.sessions.identity(&id)) {
        Some(identity) => Json(identity).into_response(),
        None => Json(json!({})).into_response(),
    }
}

/// DELETE: signs out and expires the cookie.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id);
    }
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert!(session_id(&headers).is_none());

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; siwe_session=abc-123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc-123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("siwe_session="));
        assert!(session_id(&headers).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("abc", 60),
            "siwe_session=abc; HttpOnly; Path=/; SameSite=Lax; Max-Age=60"
        );
    }
}
