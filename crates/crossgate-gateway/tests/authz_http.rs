//! HTTP surface of the authorization endpoints, with a fake remote peer.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use crossgate_core::error::{CrossgateError, Result};
use crossgate_gateway::{
    app_state::AppState,
    authz::PeerClient,
    config,
    infra::Peer,
    router::build_router,
};

const CONFIG: &str = r#"
version: 1
gateway:
  peer_name: "site-a"
peers:
  - name: "site-b"
    gateways: ["http://127.0.0.1:9"]
exports:
  - name: "billing"
  - name: "secret"
imports:
  - name: "ledger"
    sources:
      - peer: "site-b"
        export_name: "ledger"
  - name: "orphan"
policies:
  - name: "b-to-billing"
    action: allow
    from: [{ matchLabels: { "peer.name": "site-b" } }]
    to: [{ matchLabels: { "service.name": "billing" } }]
  - name: "clients-to-b"
    action: allow
    from: [{ matchExpressions: [{ key: "client.ip", operator: Exists }] }]
    to: [{ matchLabels: { "peer.name": "site-b" } }]
"#;

#[derive(Clone, Copy)]
enum Remote {
    Grant,
    Refuse,
    Down,
}

struct FakePeers {
    mode: Mutex<Remote>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakePeers {
    fn set(&self, mode: Remote) {
        *self.mode.lock().unwrap() = mode;
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerClient for FakePeers {
    async fn authorize(&self, peer: &Peer, service: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((peer.name.clone(), service.to_string()));
        let mode = *self.mode.lock().unwrap();
        match mode {
            Remote::Grant => Ok(format!("token-for-{service}")),
            Remote::Refuse => Err(CrossgateError::NotAllowed(service.to_string())),
            Remote::Down => Err(CrossgateError::UpstreamFailed("connection refused".into())),
        }
    }
}

fn setup() -> (Router, AppState, Arc<FakePeers>) {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let peers = Arc::new(FakePeers {
        mode: Mutex::new(Remote::Grant),
        calls: Mutex::new(Vec::new()),
    });
    let state = AppState::with_peer_client(cfg, peers.clone()).unwrap();
    (build_router(state.clone()), state, peers)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn peer_authz(peer: &str, service: &str) -> Request<Body> {
    Request::post("/authz")
        .header("x-peer-name", peer)
        .header("content-type", "application/json")
        .body(Body::from(format!(r#"{{"Service":"{service}"}}"#)))
        .unwrap()
}

fn egress(import: Option<&str>, client: Option<&str>) -> Request<Body> {
    let mut req = Request::post("/authz/egress/");
    if let Some(import) = import {
        req = req.header("x-import", import);
    }
    if let Some(client) = client {
        req = req.header("x-forwarded-for", client);
    }
    req.body(Body::empty()).unwrap()
}

fn ingress(authorization: Option<&str>) -> Request<Body> {
    let mut req = Request::post("/authz/ingress/");
    if let Some(v) = authorization {
        req = req.header("authorization", v);
    }
    req.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn error_code(body: &[u8]) -> String {
    let v: serde_json::Value = serde_json::from_slice(body).unwrap();
    v["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn peer_authz_mints_token_that_verifies() {
    let (app, _, _) = setup();

    let (status, _, body) = send(&app, peer_authz("site-b", "billing")).await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = v["AccessToken"].as_str().unwrap().to_string();

    let (status, headers, _) = send(&app, ingress(Some(&format!("Bearer {token}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["host"], "export-billing");

    // Scheme is case-insensitive.
    let (status, _, _) = send(&app, ingress(Some(&format!("bearer {token}")))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn peer_authz_distinguishes_missing_from_denied() {
    let (app, _, _) = setup();

    let (status, _, body) = send(&app, peer_authz("site-b", "nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, _, body) = send(&app, peer_authz("site-b", "secret")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "NOT_ALLOWED");

    let (status, _, _) = send(&app, peer_authz("site-c", "billing")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingress_rejects_bad_credentials() {
    let (app, _, _) = setup();

    let (status, _, _) = send(&app, ingress(None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, ingress(Some("Basic dXNlcjpwdw=="))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, ingress(Some("Bearer not.a.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "AUTH_FAILED");
}

#[tokio::test]
async fn egress_returns_route_and_remote_token() {
    let (app, _, peers) = setup();

    let (status, headers, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5, 192.0.2.1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["host"], "remote-peer-site-b");
    assert_eq!(headers["authorization"], "Bearer token-for-ledger");
    assert_eq!(peers.calls(), vec![("site-b".to_string(), "ledger".to_string())]);
}

#[tokio::test]
async fn egress_lookup_misses_are_not_found() {
    let (app, _, peers) = setup();

    let (status, _, _) = send(&app, egress(Some("unknown"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, egress(Some("orphan"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(peers.calls().is_empty());
}

#[tokio::test]
async fn egress_requires_headers() {
    let (app, _, _) = setup();

    for req in [
        egress(None, Some("10.0.0.5")),
        egress(Some("ledger"), None),
        egress(Some("ledger"), Some("not-an-ip")),
    ] {
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "BAD_REQUEST");
    }
}

#[tokio::test]
async fn egress_surfaces_remote_outcome() {
    let (app, _, peers) = setup();

    peers.set(Remote::Refuse);
    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    peers.set(Remote::Down);
    let (status, _, body) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "UPSTREAM_FAILED");

    // A failure is not remembered as a denial.
    peers.set(Remote::Grant);
    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(peers.calls().len(), 3);
}

#[tokio::test]
async fn admin_policy_changes_apply_immediately() {
    let (app, state, peers) = setup();

    let deny = r#"{"name":"block-5","privileged":true,"action":"deny",
        "from":[{"matchExpressions":[{"key":"client.ip","operator":"In","values":["10.0.0.5"]}]}],
        "to":[{}]}"#;
    let (status, _, _) = send(&app, json_request("POST", "/admin/policies", deny)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.handler().pdp().policies().len(), 3);

    let (status, _, body) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "NOT_ALLOWED");
    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.6"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, empty_request("GET", "/admin/policies")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed[0]["name"], "block-5");

    let (status, _, _) = send(&app, empty_request("DELETE", "/admin/policies/block-5")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(
        &app,
        empty_request("DELETE", "/admin/policies/block-5?privileged=true"),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(peers.calls().len(), 2);

    let bad = r#"{"name":"empty","action":"allow","from":[],"to":[{}]}"#;
    let (status, _, body) = send(&app, json_request("POST", "/admin/policies", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_POLICY");
}

#[tokio::test]
async fn admin_peer_toggle() {
    let (app, _, peers) = setup();

    let (status, _, _) = send(&app, empty_request("DELETE", "/admin/peers/site-b")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(peers.calls().is_empty());

    let (status, _, _) = send(&app, empty_request("PUT", "/admin/peers/site-b")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, empty_request("PUT", "/admin/peers/site-z")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_lb_schemes() {
    let (app, state, _) = setup();

    let ok = r#"{"destination":"ledger","scheme":"static","default_peer":"site-b"}"#;
    let (status, _, _) = send(&app, json_request("PUT", "/admin/lb", ok)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.handler().lb().scheme_for("*", "ledger").name(), "static");

    let bad = r#"{"destination":"ledger","scheme":"static","default_peer":"site-z"}"#;
    let (status, _, _) = send(&app, json_request("PUT", "/admin/lb", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, empty_request("DELETE", "/admin/lb?source=*&destination=*")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, empty_request("DELETE", "/admin/lb?source=*&destination=ledger")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.handler().lb().scheme_for("*", "ledger").name(), "random");
}

#[tokio::test]
async fn ops_endpoints() {
    let (app, state, _) = setup();

    let (status, _, _) = send(&app, empty_request("GET", "/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, empty_request("GET", "/readyz")).await;
    assert_eq!(status, StatusCode::OK);

    send(&app, egress(Some("ledger"), Some("10.0.0.5"))).await;
    send(&app, peer_authz("site-c", "billing")).await;
    assert_eq!(
        state
            .metrics()
            .authz_decisions
            .get(&[("direction", "egress"), ("decision", "allow")]),
        1
    );
    assert_eq!(
        state
            .metrics()
            .authz_decisions
            .get(&[("direction", "ingress"), ("decision", "deny")]),
        1
    );

    let (status, _, body) = send(&app, empty_request("GET", "/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("crossgate_authz_decisions_total"));
    assert!(text.contains("crossgate_peer_authorize_duration_micros_bucket"));

    state.metrics().set_draining();
    let (status, _, _) = send(&app, empty_request("GET", "/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn ipv6_clients_can_be_named_in_policies() {
    let (app, _, peers) = setup();

    let deny = r#"{"name":"block-v6","action":"deny",
        "from":[{"matchLabels":{"client.ip":"fd00::1"}}],
        "to":[{}]}"#;
    let (status, _, _) = send(&app, json_request("POST", "/admin/policies", deny)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, egress(Some("ledger"), Some("fd00::1"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, headers, _) = send(&app, egress(Some("ledger"), Some("fd00::2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["host"], "remote-peer-site-b");
    assert_eq!(peers.calls().len(), 1);
}
