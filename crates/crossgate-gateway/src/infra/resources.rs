use serde::{Deserialize, Serialize};

/// A remote site, reachable through one or more gateway endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Peer {
    pub name: String,
    /// Base URLs of the peer's authorization endpoints, tried in order.
    pub gateways: Vec<String>,
}

/// A local service offered to permitted peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Export {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// A local proxy for a service exported by remote peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Import {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub sources: Vec<ImportSource>,
}

/// One (peer, export) pair able to satisfy an import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSource {
    pub peer: String,
    pub export_name: String,
    #[serde(default = "default_namespace")]
    pub export_namespace: String,
}

impl ImportSource {
    pub fn new(
        peer: impl Into<String>,
        export_name: impl Into<String>,
        export_namespace: impl Into<String>,
    ) -> Self {
        Self {
            peer: peer.into(),
            export_name: export_name.into(),
            export_namespace: export_namespace.into(),
        }
    }
}

fn default_namespace() -> String {
    "default".into()
}
