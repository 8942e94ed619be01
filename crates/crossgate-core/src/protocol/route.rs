//! Route identifiers understood by the dataplane.
//!
//! Egress connections are routed to a cluster per remote peer; ingress
//! connections to a cluster per local export.

const PEER_PREFIX: &str = "remote-peer-";
const EXPORT_PREFIX: &str = "export-";

/// Route carrying egress traffic towards `peer`.
pub fn peer_route(peer: &str) -> String {
    format!("{PEER_PREFIX}{peer}")
}

/// Route delivering ingress traffic to the local export `export`.
pub fn export_route(export: &str) -> String {
    format!("{EXPORT_PREFIX}{export}")
}
