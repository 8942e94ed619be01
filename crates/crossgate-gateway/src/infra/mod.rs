//! Registries of peers, exports and imports.
//!
//! Persistence of these objects lives outside the gateway; the authorization
//! path only needs lookup-by-name, expressed by `ResourceStore`.

pub mod resources;
pub mod store;

pub use resources::{Export, Import, ImportSource, Peer};
pub use store::{InMemoryStore, ResourceStore};
