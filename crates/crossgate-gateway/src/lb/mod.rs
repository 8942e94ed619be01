//! Load balancing across the peers offering an imported service.

pub mod balancer;

pub use balancer::{LoadBalancer, Scheme, WILDCARD};
