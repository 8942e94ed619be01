//! Axum router wiring.

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/authz", post(transport::authz::peer_authz))
        .route("/authz/egress/", post(transport::authz::egress))
        .route("/authz/ingress/", post(transport::authz::ingress))
        .route(
            "/admin/policies",
            get(transport::admin::list_policies).post(transport::admin::put_policy),
        )
        .route("/admin/policies/:name", delete(transport::admin::delete_policy))
        .route(
            "/admin/lb",
            put(transport::admin::put_scheme).delete(transport::admin::delete_scheme),
        )
        .route(
            "/admin/peers/:name",
            put(transport::admin::enable_peer).delete(transport::admin::disable_peer),
        )
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
