//! Workload attributes: the key/value facts a selector is matched against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the peer owning the workload.
pub const PEER_NAME: &str = "peer.name";
/// Service name (export name on the serving side).
pub const SERVICE_NAME: &str = "service.name";
/// Service namespace.
pub const SERVICE_NAMESPACE: &str = "service.namespace";
/// Address of the local client opening the connection.
pub const CLIENT_IP: &str = "client.ip";

pub type Map = BTreeMap<String, String>;

/// Attributes of one side of a connection. Built per request, never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkloadAttrs(Map);

impl WorkloadAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Attributes describing a service offered by `peer`.
    pub fn service(name: &str, namespace: &str, peer: &str) -> Self {
        Self::new()
            .with(SERVICE_NAME, name)
            .with(SERVICE_NAMESPACE, namespace)
            .with(PEER_NAME, peer)
    }
}

impl AsRef<Map> for WorkloadAttrs {
    #[inline]
    fn as_ref(&self) -> &Map {
        &self.0
    }
}

impl From<Map> for WorkloadAttrs {
    fn from(map: Map) -> Self {
        Self(map)
    }
}

impl std::iter::FromIterator<(String, String)> for WorkloadAttrs {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> std::iter::FromIterator<(&'a str, &'a str)> for WorkloadAttrs {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
