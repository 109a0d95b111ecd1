use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ModelResult<T> = error_stack::Result<T, Error>;

#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error")]
    ParseError,

    #[error("Chain error: {0}")]
    ChainError(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Token list error: {0}")]
    TokenListError(String),

    #[error("Rate limit error: {0}")]
    RateLimitError(String),

    #[error("Serde deserialize error: {0}")]
    SerdeDeserialize(String),

    #[error("Request body too large: {0}")]
    TooLargeRequestBody(String),
}
