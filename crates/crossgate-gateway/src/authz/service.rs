//! Process entry points for connection authorization.
//!
//! Per connection attempt there are two independent exchanges:
//! 1. egress: local dataplane -> here -> remote peer's `/authz` -> token
//! 2. ingress verify: remote dataplane presents the token -> route
//!
//! Nothing is stored between them except the token itself.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use crossgate_core::error::{CrossgateError, Result};
use crossgate_core::protocol::headers::parse_bearer;
use crossgate_core::protocol::route::{export_route, peer_route};

use crate::control::{OutgoingDecision, PolicyHandler};
use crate::infra::ResourceStore;
use crate::obs::GatewayMetrics;
use crate::policy::attrs::{CLIENT_IP, PEER_NAME};
use crate::policy::{Decision, WorkloadAttrs};

use super::peer_client::PeerClient;
use super::token::TokenIssuer;

/// What the local dataplane needs to open an egress connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressGrant {
    /// Route towards the chosen peer.
    pub target: String,
    /// Token minted by that peer for the chosen export.
    pub token: String,
}

pub struct AuthzService {
    handler: Arc<PolicyHandler>,
    store: Arc<dyn ResourceStore>,
    tokens: TokenIssuer,
    peers: Arc<dyn PeerClient>,
    metrics: Arc<GatewayMetrics>,
}

impl AuthzService {
    pub fn new(
        handler: Arc<PolicyHandler>,
        store: Arc<dyn ResourceStore>,
        tokens: TokenIssuer,
        peers: Arc<dyn PeerClient>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            handler,
            store,
            tokens,
            peers,
            metrics,
        }
    }

    pub fn handler(&self) -> &Arc<PolicyHandler> {
        &self.handler
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    fn count(&self, direction: &str, outcome: &Result<impl Sized>) {
        let decision = match outcome {
            Ok(_) => "allow",
            Err(CrossgateError::NotAllowed(_)) => "deny",
            Err(_) => "error",
        };
        self.metrics
            .authz_decisions
            .inc(&[("direction", direction), ("decision", decision)]);
    }

    /// Egress: a local client at `client_ip` wants the import `import_name`.
    ///
    /// The remote call is the only suspension point; its failure is reported
    /// as-is and never turned into a denial.
    pub async fn authorize_egress(&self, import_name: &str, client_ip: IpAddr) -> Result<EgressGrant> {
        let out = self.egress(import_name, client_ip).await;
        self.count("egress", &out);
        out
    }

    async fn egress(&self, import_name: &str, client_ip: IpAddr) -> Result<EgressGrant> {
        let import = self
            .store
            .import(import_name)
            .ok_or_else(|| CrossgateError::NotFound(format!("import {import_name}")))?;
        if import.sources.is_empty() {
            return Err(CrossgateError::NotFound(format!(
                "import {import_name} has no bindings"
            )));
        }

        let src = WorkloadAttrs::new()
            .with(CLIENT_IP, client_ip.to_string())
            .with(PEER_NAME, self.handler.local_peer());

        let target = match self
            .handler
            .decide_outgoing(&src, &import.name, &import.namespace)?
        {
            OutgoingDecision::Allow(target) => target,
            OutgoingDecision::Deny => {
                tracing::info!(import = import_name, client = %client_ip, "egress denied");
                return Err(CrossgateError::NotAllowed(format!("import {import_name}")));
            }
        };

        let peer = self
            .store
            .peer(&target.peer)
            .ok_or_else(|| CrossgateError::NotFound(format!("peer {}", target.peer)))?;

        let started = Instant::now();
        let token = self.peers.authorize(&peer, &target.export_name).await;
        self.metrics
            .peer_authorize_duration
            .observe(&[("peer", &peer.name)], started.elapsed());
        let token = token?;

        tracing::info!(
            import = import_name,
            peer = %peer.name,
            export = %target.export_name,
            "egress authorized"
        );
        Ok(EgressGrant {
            target: peer_route(&peer.name),
            token,
        })
    }

    /// Ingress: a remote peer, described by `src`, asks for the local export
    /// `service`. Returns a signed access token.
    pub fn authorize_ingress(&self, service: &str, src: &WorkloadAttrs) -> Result<String> {
        let out = self.ingress(service, src);
        self.count("ingress", &out);
        out
    }

    fn ingress(&self, service: &str, src: &WorkloadAttrs) -> Result<String> {
        let export = self
            .store
            .export(service)
            .ok_or_else(|| CrossgateError::NotFound(format!("export {service}")))?;

        match self.handler.decide_incoming(src, &export.name, &export.namespace) {
            Decision::Allow => {
                tracing::info!(export = service, peer = ?src.get(PEER_NAME), "ingress authorized");
                self.tokens.mint(&export.name)
            }
            Decision::Deny => {
                tracing::info!(export = service, peer = ?src.get(PEER_NAME), "ingress denied");
                Err(CrossgateError::NotAllowed(format!("export {service}")))
            }
        }
    }

    /// Check the `authorization` header of a new remote data connection and
    /// return the route of the export it may reach.
    pub fn verify_ingress(&self, authorization: &str) -> Result<String> {
        let out = parse_bearer(authorization).and_then(|token| self.tokens.verify(token));
        let result = match &out {
            Ok(_) => "ok",
            Err(CrossgateError::BadRequest(_)) => "bad_request",
            Err(_) => "rejected",
        };
        self.metrics
            .token_verifications
            .inc(&[("result", result)]);
        out.map(|service| export_route(&service))
    }
}
