//! Wire protocol definitions.
//!
//! - `authz`: peer-to-peer authorization bodies (`POST /authz`)
//! - `headers`: dataplane-facing header names and bearer parsing
//! - `route`: route identifiers handed back to the dataplane

pub mod authz;
pub mod headers;
pub mod route;
