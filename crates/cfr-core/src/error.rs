//! Error types shared by the gateway implementations.
use thiserror::Error;

/// Failures talking to a chain or campaign service.
///
/// Never retried by the callers: a failed broadcast may still have been
/// accepted upstream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("request failed: {0}")] Http(String),
    #[error("service returned {status}: {body}")] Status { status: u16, body: String },
    #[error("unexpected response: {0}")] Decode(String),
    #[error("RPC error: {0}")] Rpc(String),
}
