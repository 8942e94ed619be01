//! Authorization endpoints.
//!
//! - `POST /authz`: remote peer asks for a token to one of our exports
//! - `POST /authz/egress/`: local dataplane wants to reach an import
//! - `POST /authz/ingress/`: local dataplane checks a remote connection's token

use std::net::IpAddr;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crossgate_core::error::CrossgateError;
use crossgate_core::protocol::authz::{AuthzRequest, AuthzResponse};
use crossgate_core::protocol::headers::{self, bearer, first_forwarded};

use crate::app_state::AppState;
use crate::policy::{attrs::PEER_NAME, WorkloadAttrs};

use super::error::ApiError;

fn header_str<'a>(map: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    map.get(name)
        .map(|v| {
            v.to_str().map_err(|_| {
                ApiError::from(CrossgateError::BadRequest(format!(
                    "{name} header is not valid text"
                )))
            })
        })
        .transpose()
}

pub async fn peer_authz(
    State(app): State<AppState>,
    hdrs: HeaderMap,
    Json(req): Json<AuthzRequest>,
) -> Result<Json<AuthzResponse>, ApiError> {
    let mut src = WorkloadAttrs::new();
    if let Some(peer) = header_str(&hdrs, headers::PEER_NAME)? {
        src.insert(PEER_NAME, peer);
    }

    let access_token = app.authz().authorize_ingress(&req.service, &src)?;
    Ok(Json(AuthzResponse { access_token }))
}

pub async fn egress(State(app): State<AppState>, hdrs: HeaderMap) -> Result<Response, ApiError> {
    let import = header_str(&hdrs, headers::IMPORT)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CrossgateError::BadRequest(format!("missing {} header", headers::IMPORT)))?;

    let client_ip: IpAddr = header_str(&hdrs, headers::FORWARDED_FOR)?
        .and_then(first_forwarded)
        .ok_or_else(|| CrossgateError::BadRequest(format!("missing {} header", headers::FORWARDED_FOR)))?
        .parse()
        .map_err(|_| CrossgateError::BadRequest("client address is not an IP".into()))?;

    let grant = app.authz().authorize_egress(import, client_ip).await?;

    Ok((
        StatusCode::OK,
        [
            (headers::HOST, grant.target),
            (headers::AUTHORIZATION, bearer(&grant.token)),
        ],
    )
        .into_response())
}

pub async fn ingress(State(app): State<AppState>, hdrs: HeaderMap) -> Result<Response, ApiError> {
    let authorization = header_str(&hdrs, headers::AUTHORIZATION)?
        .ok_or_else(|| CrossgateError::BadRequest("missing authorization header".into()))?;

    let target = app.authz().verify_ingress(authorization)?;

    Ok((StatusCode::OK, [(headers::HOST, target)]).into_response())
}
