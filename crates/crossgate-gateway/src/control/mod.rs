//! Connection decisions: PDP + load balancer + peer eligibility.

pub mod handler;

pub use handler::{OutgoingDecision, PolicyHandler};
