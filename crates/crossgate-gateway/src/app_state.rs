//! Shared application state for the crossgate gateway.
//!
//! Builds the policy handler, registries, token issuer and authorization
//! service from config. Startup errors are returned, never panicked on.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use crossgate_core::error::{CrossgateError, Result};

use crate::authz::{AuthzService, HttpPeerClient, PeerClient, TokenIssuer};
use crate::config::GatewayConfig;
use crate::control::PolicyHandler;
use crate::infra::{InMemoryStore, ResourceStore};
use crate::obs::GatewayMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    store: Arc<InMemoryStore>,
    handler: Arc<PolicyHandler>,
    authz: AuthzService,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Build application state talking to peers over HTTP.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let peers = HttpPeerClient::new(
            cfg.gateway.peer_name.clone(),
            Duration::from_millis(cfg.gateway.peer_timeout_ms),
        )?;
        Self::with_peer_client(cfg, Arc::new(peers))
    }

    pub fn with_peer_client(cfg: GatewayConfig, peers: Arc<dyn PeerClient>) -> Result<Self> {
        let gw = &cfg.gateway;
        let ttl = Duration::from_secs(gw.token_ttl_secs);

        // 1) Signing key
        let tokens = match &gw.signing_key_path {
            Some(path) => {
                let pem = fs::read_to_string(path).map_err(|e| {
                    CrossgateError::Internal(format!("read signing key {path} failed: {e}"))
                })?;
                TokenIssuer::from_pem(&pem, ttl)?
            }
            None => {
                tracing::info!("no signing key configured, generated an ephemeral key pair");
                TokenIssuer::generate(ttl)?
            }
        };

        // 2) Registries + policy handler
        let store = Arc::new(InMemoryStore::new());
        let handler = Arc::new(PolicyHandler::new(gw.peer_name.clone()));

        for peer in &cfg.peers {
            store.upsert_peer(peer.clone());
            handler.add_peer(&peer.name);
        }

        for export in &cfg.exports {
            store.upsert_export(export.clone());
            let peers = handler.add_export(export);
            tracing::debug!(export = %export.name, ?peers, "export registered");
        }

        for import in &cfg.imports {
            for source in &import.sources {
                if store.peer(&source.peer).is_none() {
                    tracing::warn!(import = %import.name, peer = %source.peer, "import source refers to unknown peer");
                }
            }
            store.upsert_import(import.clone());
            handler.add_import(import);
        }

        // 3) Policies and schemes (after imports: static schemes need peers)
        for policy in &cfg.policies {
            handler.add_policy(policy.clone()).map_err(|e| {
                CrossgateError::InvalidPolicy(format!("policy {} rejected: {e}", policy.name))
            })?;
        }

        for rule in &cfg.load_balancing {
            handler.set_lb_scheme(&rule.source, &rule.destination, rule.scheme()?)?;
        }

        let metrics = Arc::new(GatewayMetrics::default());
        let resources: Arc<dyn ResourceStore> = store.clone();
        let authz = AuthzService::new(
            Arc::clone(&handler),
            resources,
            tokens,
            peers,
            Arc::clone(&metrics),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                handler,
                authz,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.inner.store
    }

    pub fn handler(&self) -> &PolicyHandler {
        &self.inner.handler
    }

    pub fn authz(&self) -> &AuthzService {
        &self.inner.authz
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn is_known_peer(&self, name: &str) -> bool {
        self.inner.store.peer(name).is_some()
    }
}
