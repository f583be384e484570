//! Error types for the gateway client

use lightify_protocol::ProtocolError;
use thiserror::Error;

/// Errors returned by the gateway client
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Socket or decoding failure
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// IO error reading a device type table
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed device type table
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
