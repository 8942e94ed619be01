//! Peer authorization exchange (JSON).
//!
//! Field names are capitalised on the wire.

use serde::{Deserialize, Serialize};

/// Body of `POST /authz`, sent by a remote peer's controlplane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzRequest {
    /// Name of the exported service the remote peer wants to reach.
    #[serde(rename = "Service")]
    pub service: String,
}

/// Successful answer to `POST /authz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzResponse {
    /// Signed, short-lived access token scoped to the requested export.
    #[serde(rename = "AccessToken")]
    pub access_token: String,
}
