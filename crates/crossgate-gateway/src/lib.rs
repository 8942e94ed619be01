//! crossgate gateway library entry.
//!
//! This crate wires the policy decision engine, load balancer, policy
//! handler, access tokens and authorization service into an HTTP gateway.
//! It is consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod authz;
pub mod config;
pub mod control;
pub mod infra;
pub mod lb;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod transport;
