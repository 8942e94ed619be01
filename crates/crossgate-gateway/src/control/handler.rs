//! Policy handler.
//!
//! Incoming: one PDP decision for a local export.
//! Outgoing: import sources -> enabled peers -> batched PDP decision ->
//! load-balancer pick among the allowed sources.

use dashmap::DashSet;

use crossgate_core::error::Result;

use crate::infra::{Export, Import, ImportSource};
use crate::lb::{LoadBalancer, Scheme, WILDCARD};
use crate::policy::attrs::SERVICE_NAME;
use crate::policy::{Decision, DecisionEngine, Policy, WorkloadAttrs};

/// Result of an outgoing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingDecision {
    /// Connect through `source.peer` to its `source.export_name`.
    Allow(ImportSource),
    Deny,
}

impl OutgoingDecision {
    pub fn decision(&self) -> Decision {
        match self {
            OutgoingDecision::Allow(_) => Decision::Allow,
            OutgoingDecision::Deny => Decision::Deny,
        }
    }
}

/// Construct once per process and share via Arc.
pub struct PolicyHandler {
    local_peer: String,
    pdp: DecisionEngine,
    lb: LoadBalancer,
    enabled_peers: DashSet<String>,
}

impl PolicyHandler {
    pub fn new(local_peer: impl Into<String>) -> Self {
        Self {
            local_peer: local_peer.into(),
            pdp: DecisionEngine::new(),
            lb: LoadBalancer::new(),
            enabled_peers: DashSet::new(),
        }
    }

    pub fn local_peer(&self) -> &str {
        &self.local_peer
    }

    pub fn pdp(&self) -> &DecisionEngine {
        &self.pdp
    }

    pub fn lb(&self) -> &LoadBalancer {
        &self.lb
    }

    // --------------------
    // Decisions
    // --------------------

    /// May `src` reach the local export `name`?
    pub fn decide_incoming(&self, src: &WorkloadAttrs, name: &str, namespace: &str) -> Decision {
        let dst = WorkloadAttrs::service(name, namespace, &self.local_peer);
        let res = self.pdp.decide_one(src, &dst);
        tracing::debug!(
            export = name,
            decision = res.decision.as_str(),
            matched_by = %res.matched_by,
            privileged = res.privileged_match,
            "incoming decision"
        );
        res.decision
    }

    /// Which enabled, policy-permitted peer should carry `src` to the import
    /// `name`, if any.
    pub fn decide_outgoing(
        &self,
        src: &WorkloadAttrs,
        name: &str,
        namespace: &str,
    ) -> Result<OutgoingDecision> {
        let sources: Vec<ImportSource> = match self.lb.get_import_sources(name) {
            Ok(sources) => sources
                .into_iter()
                .filter(|s| self.enabled_peers.contains(&s.peer))
                .collect(),
            Err(e) => {
                tracing::warn!(import = name, namespace, error = %e, "no import sources");
                return Ok(OutgoingDecision::Deny);
            }
        };
        if sources.is_empty() {
            tracing::warn!(import = name, namespace, "no enabled peers offer import");
            return Ok(OutgoingDecision::Deny);
        }

        let dests: Vec<WorkloadAttrs> = sources
            .iter()
            .map(|s| WorkloadAttrs::service(&s.export_name, &s.export_namespace, &s.peer))
            .collect();
        let decisions = self.pdp.decide(src, &dests);

        let allowed: Vec<ImportSource> = sources
            .into_iter()
            .zip(decisions)
            .filter_map(|(s, d)| {
                tracing::debug!(
                    import = name,
                    peer = %s.peer,
                    decision = d.decision.as_str(),
                    matched_by = %d.matched_by,
                    "outgoing candidate"
                );
                d.is_allow().then_some(s)
            })
            .collect();
        if allowed.is_empty() {
            return Ok(OutgoingDecision::Deny);
        }

        let source = src.get(SERVICE_NAME).unwrap_or(WILDCARD);
        let target = self.lb.lookup_with(source, name, &allowed)?;
        Ok(OutgoingDecision::Allow(target))
    }

    // --------------------
    // Peers
    // --------------------

    pub fn add_peer(&self, name: &str) {
        if self.enabled_peers.insert(name.to_string()) {
            tracing::info!(peer = name, "peer enabled");
        }
    }

    /// Disable `name`. Its import sources stay known to the load balancer.
    pub fn delete_peer(&self, name: &str) {
        if self.enabled_peers.remove(name).is_some() {
            tracing::info!(peer = name, "peer disabled");
        }
    }

    pub fn is_peer_enabled(&self, name: &str) -> bool {
        self.enabled_peers.contains(name)
    }

    // --------------------
    // Imports / exports
    // --------------------

    /// Replace the sources known for `import`.
    pub fn add_import(&self, import: &Import) {
        self.lb.replace_sources(&import.name, import.sources.clone());
        tracing::info!(import = %import.name, sources = import.sources.len(), "import updated");
    }

    pub fn delete_import(&self, name: &str) {
        self.lb.remove_dest_service(name, None);
        tracing::info!(import = name, "import deleted");
    }

    /// Peers an export may be advertised to. Advertisement is not
    /// authorization: the ingress decision still applies per connection.
    pub fn add_export(&self, export: &Export) -> Vec<String> {
        let mut peers: Vec<String> = self.enabled_peers.iter().map(|p| p.key().clone()).collect();
        peers.sort();
        tracing::debug!(export = %export.name, peers = peers.len(), "export advertised");
        peers
    }

    // --------------------
    // Administration
    // --------------------

    pub fn add_policy(&self, policy: Policy) -> Result<()> {
        self.pdp.add_or_update(policy)
    }

    pub fn delete_policy(&self, name: &str, privileged: bool) -> Result<()> {
        self.pdp.delete(name, privileged)
    }

    pub fn set_lb_scheme(&self, source: &str, destination: &str, scheme: Scheme) -> Result<()> {
        self.lb.set_scheme(source, destination, scheme)
    }

    pub fn delete_lb_scheme(&self, source: &str, destination: &str) -> Result<()> {
        self.lb.delete_scheme(source, destination)
    }
}
