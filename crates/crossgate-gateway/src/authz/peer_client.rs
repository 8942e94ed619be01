//! Calls to a remote peer's `POST /authz`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crossgate_core::error::{CrossgateError, Result};
use crossgate_core::protocol::authz::{AuthzRequest, AuthzResponse};
use crossgate_core::protocol::headers::PEER_NAME;

use crate::infra::Peer;

/// Obtains an access token for `service` from `peer`.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn authorize(&self, peer: &Peer, service: &str) -> Result<String>;
}

/// Tries the peer's gateways in order. Transport errors and 5xx move on to
/// the next gateway; 401 and 404 are answers, not failures.
pub struct HttpPeerClient {
    http: reqwest::Client,
    local_peer: String,
}

impl HttpPeerClient {
    pub fn new(local_peer: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrossgateError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            local_peer: local_peer.into(),
        })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn authorize(&self, peer: &Peer, service: &str) -> Result<String> {
        let mut last = CrossgateError::UpstreamFailed(format!("peer {} has no gateways", peer.name));
        let body = AuthzRequest {
            service: service.to_string(),
        };

        for gateway in &peer.gateways {
            let url = format!("{}/authz", gateway.trim_end_matches('/'));
            let resp = match self
                .http
                .post(&url)
                .header(PEER_NAME, &self.local_peer)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(peer = %peer.name, %url, error = %e, "peer authorization request failed");
                    last = if e.is_timeout() {
                        CrossgateError::Timeout
                    } else {
                        CrossgateError::UpstreamFailed(format!("{url}: {e}"))
                    };
                    continue;
                }
            };

            match resp.status() {
                StatusCode::OK => match resp.json::<AuthzResponse>().await {
                    Ok(body) => return Ok(body.access_token),
                    Err(e) => {
                        tracing::warn!(peer = %peer.name, %url, error = %e, "malformed peer authorization response");
                        last = CrossgateError::UpstreamFailed(format!("{url}: malformed response"));
                    }
                },
                StatusCode::NOT_FOUND => {
                    return Err(CrossgateError::NotFound(format!(
                        "export {service} at peer {}",
                        peer.name
                    )));
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(CrossgateError::NotAllowed(format!(
                        "peer {} denied {service}",
                        peer.name
                    )));
                }
                status => {
                    tracing::warn!(peer = %peer.name, %url, %status, "peer authorization failed");
                    last = CrossgateError::UpstreamFailed(format!("{url}: {status}"));
                }
            }
        }

        Err(last)
    }
}
