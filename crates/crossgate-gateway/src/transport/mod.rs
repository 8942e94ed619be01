//! HTTP transport (axum handlers).
//!
//! Authorization endpoints for peers and the local dataplane, plus the
//! administrative API. Handlers stay thin and delegate to `AuthzService`
//! and `PolicyHandler`.

pub mod admin;
pub mod authz;
pub mod error;

pub use error::ApiError;
