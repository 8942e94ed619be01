//! crossgate core: transport-agnostic authorization contracts and error types.
//!
//! This crate defines the wire-level contracts (authorization request and
//! response bodies, header names, route identifiers) and the error surface
//! shared by the gateway and its peers. It carries no transport or runtime
//! dependencies so remote peers and tooling can reuse it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `CrossgateError`/`Result` so a single
//! malformed request only fails its own connection attempt.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{CrossgateError, Result};
