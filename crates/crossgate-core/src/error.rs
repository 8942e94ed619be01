//! Shared error type across crossgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Policy or scheme rejected at admission time.
    InvalidPolicy,
    /// Unknown import, export, peer or policy.
    NotFound,
    /// Access token missing, malformed, expired or forged.
    AuthFailed,
    /// Denied by policy.
    NotAllowed,
    /// No peer can currently serve the destination.
    NoTargetPeers,
    /// Remote peer could not be reached or failed.
    UpstreamFailed,
    /// Remote peer did not answer in time.
    Timeout,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::InvalidPolicy => "INVALID_POLICY",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::NotAllowed => "NOT_ALLOWED",
            ClientCode::NoTargetPeers => "NO_TARGET_PEERS",
            ClientCode::UpstreamFailed => "UPSTREAM_FAILED",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CrossgateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum CrossgateError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("not allowed: {0}")]
    NotAllowed(String),
    #[error("no target peers for {0}")]
    NoTargetPeers(String),
    #[error("upstream failed: {0}")]
    UpstreamFailed(String),
    #[error("timeout")]
    Timeout,
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl CrossgateError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            CrossgateError::BadRequest(_) => ClientCode::BadRequest,
            CrossgateError::InvalidPolicy(_) => ClientCode::InvalidPolicy,
            CrossgateError::NotFound(_) => ClientCode::NotFound,
            CrossgateError::AuthFailed => ClientCode::AuthFailed,
            CrossgateError::NotAllowed(_) => ClientCode::NotAllowed,
            CrossgateError::NoTargetPeers(_) => ClientCode::NoTargetPeers,
            CrossgateError::UpstreamFailed(_) => ClientCode::UpstreamFailed,
            CrossgateError::Timeout => ClientCode::Timeout,
            CrossgateError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            CrossgateError::Internal(_) => ClientCode::Internal,
        }
    }
}
