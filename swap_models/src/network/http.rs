use crate::error::{Error, ModelResult};
use error_stack::{ResultExt, report};
use reqwest::Response;
use serde_json::value::Value;

/// Converts a JSON object into a query string with keys sorted
/// alphabetically. `null` members are dropped, strings are emitted
/// without quotes, other values use their JSON text.
///
/// Values are not percent-encoded: callers only pass addresses, integer
/// amounts and plain numbers.
pub fn value_to_sorted_querystring(value: &Value) -> ModelResult<String> {
    let Value::Object(map) = value else {
        return Err(
            report!(Error::ParseError).attach_printable(format!("Invalid JSON Object: {value:?}"))
        );
    };

    let mut pairs: Vec<(&String, String)> = map
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::String(s) => (k, s.clone()),
            _ => (k, v.to_string()),
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    Ok(pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&"))
}

/// Upstream status and JSON body, relayed as-is by the proxy routes.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedResponse {
    pub status: u16,
    pub body: Value,
}

/// Reads the body as JSON whatever the status code, so error payloads
/// (validation failures and the like) reach the caller untouched.
pub async fn relay_json_response(response: Response) -> ModelResult<RelayedResponse> {
    let status = response.status().as_u16();
    let body = response
        .json::<Value>()
        .await
        .change_context(Error::SerdeDeserialize(
            "Upstream body is not JSON".to_string(),
        ))
        .attach_printable_lazy(|| format!("HTTP status {status}"))?;

    Ok(RelayedResponse { status, body })
}
