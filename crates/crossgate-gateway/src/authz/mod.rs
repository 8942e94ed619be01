//! Authorization service: egress/ingress exchanges and access tokens.
//!
//! Egress asks a remote peer for a token; ingress mints one for a remote
//! peer; verification checks a token presented on a new data connection.

pub mod peer_client;
pub mod service;
pub mod token;

pub use peer_client::{HttpPeerClient, PeerClient};
pub use service::{AuthzService, EgressGrant};
pub use token::TokenIssuer;
