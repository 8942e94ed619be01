//! Top-level facade crate for crossgate.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use crossgate_core::*;
}

pub mod gateway {
    pub use crossgate_gateway::*;
}
