//! Client error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Failure while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected JSON object envelope")]
    NotAnObject,

    #[error("missing envelope type")]
    MissingKind,

    #[error("invalid {kind} envelope: {reason}")]
    InvalidContent { kind: String, reason: String },
}

/// Transport-level failure reported by a [`crate::connection::Channel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel is not open")]
    NotOpen,

    #[error("failed to open channel: {0}")]
    Open(String),

    #[error("failed to write to channel: {0}")]
    Write(String),
}

/// Errors from building a client: bad configuration or renderer patterns.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
