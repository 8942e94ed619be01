use std::collections::HashSet;

use serde::Deserialize;

use crossgate_core::error::{CrossgateError, Result};

use crate::infra::{Export, Import, Peer};
use crate::lb::Scheme;
use crate::policy::Policy;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    pub gateway: GatewaySection,

    #[serde(default)]
    pub peers: Vec<Peer>,

    #[serde(default)]
    pub exports: Vec<Export>,

    #[serde(default)]
    pub imports: Vec<Import>,

    #[serde(default)]
    pub policies: Vec<Policy>,

    #[serde(default)]
    pub load_balancing: Vec<SchemeAssignment>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CrossgateError::UnsupportedVersion);
        }

        self.gateway.validate()?;

        let mut seen = HashSet::new();
        for p in &self.peers {
            if p.name.is_empty() || !seen.insert(p.name.as_str()) {
                return Err(CrossgateError::BadRequest(format!(
                    "peers: empty or duplicate name {:?}",
                    p.name
                )));
            }
            if p.gateways.is_empty() {
                return Err(CrossgateError::BadRequest(format!(
                    "peer {} must list at least one gateway",
                    p.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for e in &self.exports {
            if e.name.is_empty() || !seen.insert(e.name.as_str()) {
                return Err(CrossgateError::BadRequest(format!(
                    "exports: empty or duplicate name {:?}",
                    e.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for i in &self.imports {
            if i.name.is_empty() || !seen.insert(i.name.as_str()) {
                return Err(CrossgateError::BadRequest(format!(
                    "imports: empty or duplicate name {:?}",
                    i.name
                )));
            }
        }

        for lb in &self.load_balancing {
            lb.scheme()?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// This site's name, as known to its peers.
    pub peer_name: String,

    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// PKCS#8 P-256 private key; a key pair is generated when absent.
    #[serde(default)]
    pub signing_key_path: Option<String>,
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.peer_name.trim().is_empty() {
            return Err(CrossgateError::BadRequest(
                "gateway.peer_name must not be empty".into(),
            ));
        }
        if !(100..=60000).contains(&self.peer_timeout_ms) {
            return Err(CrossgateError::BadRequest(
                "gateway.peer_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(1..=60).contains(&self.token_ttl_secs) {
            return Err(CrossgateError::BadRequest(
                "gateway.token_ttl_secs must be between 1 and 60".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8443".into()
}
fn default_peer_timeout_ms() -> u64 {
    3000
}
fn default_token_ttl_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    Random,
    RoundRobin,
    Static,
}

/// One load-balancing rule; also the body of `PUT /admin/lb`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeAssignment {
    #[serde(default = "wildcard")]
    pub source: String,
    #[serde(default = "wildcard")]
    pub destination: String,
    pub scheme: SchemeKind,
    #[serde(default)]
    pub default_peer: Option<String>,
}

impl SchemeAssignment {
    pub fn scheme(&self) -> Result<Scheme> {
        match (self.scheme, &self.default_peer) {
            (SchemeKind::Random, None) => Ok(Scheme::Random),
            (SchemeKind::RoundRobin, None) => Ok(Scheme::RoundRobin),
            (SchemeKind::Static, Some(peer)) => Ok(Scheme::Static {
                default_peer: peer.clone(),
            }),
            (SchemeKind::Static, None) => Err(CrossgateError::InvalidPolicy(
                "static scheme requires default_peer".into(),
            )),
            (_, Some(_)) => Err(CrossgateError::InvalidPolicy(
                "default_peer is only valid with the static scheme".into(),
            )),
        }
    }
}

fn wildcard() -> String {
    crate::lb::WILDCARD.into()
}
