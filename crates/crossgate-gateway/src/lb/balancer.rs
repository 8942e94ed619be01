//! Peer selection for imported services.
//!
//! Three independent maps, each sharded by `DashMap`:
//! - `destination -> [ImportSource]`: who can serve a destination right now
//! - `(source, destination) -> Scheme`: how to pick among them
//! - `(source, destination) -> ServiceState`: connection counters
//!
//! Scheme lookup goes from most to least specific: `(src, dst)`,
//! `(src, *)`, `(*, dst)`, then the `(*, *)` default which always exists.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rand::seq::SliceRandom;

use crossgate_core::error::{CrossgateError, Result};

use crate::infra::ImportSource;

pub const WILDCARD: &str = "*";

/// How one peer is picked among the policy-permitted candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    Random,
    /// Rotates over the candidates using the destination-wide counter.
    RoundRobin,
    /// Prefers `default_peer`; random when it is not a candidate.
    Static { default_peer: String },
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Random => "random",
            Scheme::RoundRobin => "round_robin",
            Scheme::Static { .. } => "static",
        }
    }
}

type PairKey = (String, String);

fn key(source: &str, destination: &str) -> PairKey {
    (source.to_string(), destination.to_string())
}

#[derive(Debug, Default)]
struct ServiceState {
    connections: AtomicU64,
}

/// Construct once per process and share via Arc.
#[derive(Debug)]
pub struct LoadBalancer {
    services: DashMap<String, Vec<ImportSource>>,
    schemes: DashMap<PairKey, Scheme>,
    state: DashMap<PairKey, ServiceState>,
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer {
    pub fn new() -> Self {
        let schemes = DashMap::new();
        schemes.insert(key(WILDCARD, WILDCARD), Scheme::Random);
        Self {
            services: DashMap::new(),
            schemes,
            state: DashMap::new(),
        }
    }

    // --------------------
    // Service map
    // --------------------

    /// Record that `source.peer` can serve `destination`. A peer appears at
    /// most once per destination; re-adding it replaces its source.
    pub fn add_to_service_map(&self, destination: &str, source: ImportSource) {
        let mut sources = self.services.entry(destination.to_string()).or_default();
        match sources.iter().position(|s| s.peer == source.peer) {
            Some(i) => sources[i] = source,
            None => {
                tracing::debug!(destination, peer = %source.peer, "import source added");
                sources.push(source);
            }
        }
    }

    /// Swap the whole peer set of `destination` in one write, so a
    /// concurrent lookup sees either the old set or the new one. Duplicate
    /// peers keep their last source; an empty list removes the destination.
    pub fn replace_sources(&self, destination: &str, sources: Vec<ImportSource>) {
        let mut deduped: Vec<ImportSource> = Vec::with_capacity(sources.len());
        for source in sources {
            match deduped.iter().position(|s| s.peer == source.peer) {
                Some(i) => deduped[i] = source,
                None => deduped.push(source),
            }
        }

        if deduped.is_empty() {
            self.services.remove(destination);
        } else {
            tracing::debug!(destination, peers = deduped.len(), "import sources replaced");
            self.services.insert(destination.to_string(), deduped);
        }
    }

    /// Forget `peer` for every destination.
    pub fn remove_peer_from_service_map(&self, peer: &str) {
        self.services.retain(|_, sources| {
            sources.retain(|s| s.peer != peer);
            !sources.is_empty()
        });
        tracing::debug!(peer, "peer removed from service map");
    }

    /// Remove one peer from `destination`, or the whole destination when
    /// `peer` is `None`.
    pub fn remove_dest_service(&self, destination: &str, peer: Option<&str>) {
        match peer {
            None => {
                self.services.remove(destination);
            }
            Some(peer) => {
                self.services.remove_if_mut(destination, |_, sources| {
                    sources.retain(|s| s.peer != peer);
                    sources.is_empty()
                });
            }
        }
    }

    pub fn get_import_sources(&self, destination: &str) -> Result<Vec<ImportSource>> {
        self.services
            .get(destination)
            .map(|r| r.value().clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CrossgateError::NoTargetPeers(destination.to_string()))
    }

    pub fn get_target_peers(&self, destination: &str) -> Result<Vec<String>> {
        Ok(self
            .get_import_sources(destination)?
            .into_iter()
            .map(|s| s.peer)
            .collect())
    }

    // --------------------
    // Schemes
    // --------------------

    pub fn set_scheme(&self, source: &str, destination: &str, scheme: Scheme) -> Result<()> {
        if let Scheme::Static { default_peer } = &scheme {
            if destination == WILDCARD {
                return Err(CrossgateError::InvalidPolicy(
                    "static scheme requires a concrete destination".into(),
                ));
            }
            // Keep the destination's entry read-locked until the scheme is
            // stored, so the default peer cannot be removed in between.
            let sources = self.services.get(destination);
            let serves = sources
                .as_ref()
                .is_some_and(|s| s.iter().any(|s| &s.peer == default_peer));
            if !serves {
                return Err(CrossgateError::InvalidPolicy(format!(
                    "default peer {default_peer} does not serve {destination}"
                )));
            }
            tracing::info!(source, destination, scheme = scheme.name(), "lb scheme set");
            self.schemes.insert(key(source, destination), scheme);
            drop(sources);
            return Ok(());
        }
        tracing::info!(source, destination, scheme = scheme.name(), "lb scheme set");
        self.schemes.insert(key(source, destination), scheme);
        Ok(())
    }

    pub fn delete_scheme(&self, source: &str, destination: &str) -> Result<()> {
        if source == WILDCARD && destination == WILDCARD {
            return Err(CrossgateError::InvalidPolicy(
                "default lb scheme cannot be deleted".into(),
            ));
        }
        self.schemes
            .remove(&key(source, destination))
            .ok_or_else(|| CrossgateError::NotFound(format!("lb scheme {source} -> {destination}")))?;
        tracing::info!(source, destination, "lb scheme deleted");
        Ok(())
    }

    /// The scheme that applies to `source -> destination`.
    pub fn scheme_for(&self, source: &str, destination: &str) -> Scheme {
        [
            (source, destination),
            (source, WILDCARD),
            (WILDCARD, destination),
            (WILDCARD, WILDCARD),
        ]
        .into_iter()
        .find_map(|(s, d)| self.schemes.get(&key(s, d)).map(|r| r.value().clone()))
        .unwrap_or(Scheme::Random)
    }

    // --------------------
    // Selection
    // --------------------

    /// Connections counted for `source -> destination` (`*` as source gives
    /// the destination-wide total).
    pub fn connections(&self, source: &str, destination: &str) -> u64 {
        self.state
            .get(&key(source, destination))
            .map(|s| s.connections.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Bump the pair and destination-wide counters; returns the
    /// destination-wide count before this connection.
    fn record_connection(&self, source: &str, destination: &str) -> u64 {
        if source != WILDCARD {
            self.state
                .entry(key(source, destination))
                .or_default()
                .connections
                .fetch_add(1, Ordering::Relaxed);
        }
        self.state
            .entry(key(WILDCARD, destination))
            .or_default()
            .connections
            .fetch_add(1, Ordering::Relaxed)
    }

    /// Pick one of `candidates` for `source -> destination`.
    ///
    /// Candidates are expected to be already filtered by policy; an empty
    /// slice is an error, never an empty pick.
    pub fn lookup_with(
        &self,
        source: &str,
        destination: &str,
        candidates: &[ImportSource],
    ) -> Result<ImportSource> {
        if candidates.is_empty() {
            return Err(CrossgateError::NoTargetPeers(destination.to_string()));
        }

        let scheme = self.scheme_for(source, destination);
        let seen = self.record_connection(source, destination);

        let picked = match &scheme {
            Scheme::Random => pick_random(candidates),
            Scheme::RoundRobin => candidates.get((seen % candidates.len() as u64) as usize),
            Scheme::Static { default_peer } => {
                match candidates.iter().find(|c| &c.peer == default_peer) {
                    Some(c) => Some(c),
                    None => {
                        tracing::warn!(
                            source,
                            destination,
                            default_peer = %default_peer,
                            "static default peer unavailable, falling back to random"
                        );
                        pick_random(candidates)
                    }
                }
            }
        };

        let picked = picked
            .cloned()
            .ok_or_else(|| CrossgateError::NoTargetPeers(destination.to_string()))?;
        tracing::debug!(
            source,
            destination,
            scheme = scheme.name(),
            peer = %picked.peer,
            "lb picked peer"
        );
        Ok(picked)
    }
}

fn pick_random(candidates: &[ImportSource]) -> Option<&ImportSource> {
    candidates.choose(&mut rand::thread_rng())
}
