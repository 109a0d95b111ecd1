use error_stack::{AttachmentKind, FrameKind, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DappResult<T> = error_stack::Result<T, Error>;

#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error")]
    ParseError,

    #[error("Reqwest error")]
    ReqwestError,

    #[error("Response error")]
    ResponseError,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Aggregator error: {0}")]
    AggregatorError(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Invalid swap state: {0}")]
    InvalidState(String),

    #[error("SIWE message error: {0}")]
    SiweMessage(String),

    #[error("SIWE verification failed: {0}")]
    SiweVerification(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Models error")]
    ModelsError,

    #[error("Server error: {0}")]
    ServerError(String),
}

pub trait ReportDisplayExt {
    fn format(&self) -> String;
}

impl ReportDisplayExt for Report<Error> {
    /// Printable attachments only, in frame order. Falls back to the
    /// context when nothing was attached.
    fn format(&self) -> String {
        let attachments: Vec<String> = self
            .frames()
            .filter_map(|frame| match frame.kind() {
                FrameKind::Attachment(AttachmentKind::Printable(attachment)) => {
                    Some(attachment.to_string())
                }
                _ => None,
            })
            .collect();

        if attachments.is_empty() {
            self.current_context().to_string()
        } else {
            attachments.join(" ")
        }
    }
}
