//! Gateway error types.

use thiserror::Error;

/// Errors surfaced by the platform REST client after its retry budget
/// is exhausted.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network-level failure (connection reset, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The platform kept answering 429 for the whole retry budget.
    #[error("rate limited by the platform after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Terminal non-2xx response.
    #[error("remote rejected the request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// A 2xx response carried a body this client could not decode.
    #[error("malformed response payload: {0}")]
    Payload(String),
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
