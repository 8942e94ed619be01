//! Administrative endpoints for policies, load-balancing schemes and peer
//! eligibility. Changes are held in memory only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crossgate_core::error::CrossgateError;

use crate::app_state::AppState;
use crate::config::SchemeAssignment;
use crate::policy::Policy;

use super::error::ApiError;

pub async fn list_policies(State(app): State<AppState>) -> Json<Vec<Policy>> {
    Json(app.handler().pdp().policies())
}

pub async fn put_policy(
    State(app): State<AppState>,
    Json(policy): Json<Policy>,
) -> Result<StatusCode, ApiError> {
    app.handler().add_policy(policy)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TierQuery {
    #[serde(default)]
    pub privileged: bool,
}

pub async fn delete_policy(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<TierQuery>,
) -> Result<StatusCode, ApiError> {
    app.handler().delete_policy(&name, q.privileged)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_scheme(
    State(app): State<AppState>,
    Json(rule): Json<SchemeAssignment>,
) -> Result<StatusCode, ApiError> {
    let scheme = rule.scheme()?;
    app.handler()
        .set_lb_scheme(&rule.source, &rule.destination, scheme)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SchemeQuery {
    pub source: String,
    pub destination: String,
}

pub async fn delete_scheme(
    State(app): State<AppState>,
    Query(q): Query<SchemeQuery>,
) -> Result<StatusCode, ApiError> {
    app.handler().delete_lb_scheme(&q.source, &q.destination)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enable_peer(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !app.is_known_peer(&name) {
        return Err(CrossgateError::NotFound(format!("peer {name}")).into());
    }
    app.handler().add_peer(&name);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn disable_peer(State(app): State<AppState>, Path(name): Path<String>) -> StatusCode {
    app.handler().delete_peer(&name);
    StatusCode::NO_CONTENT
}
