use dashmap::DashMap;

use super::resources::{Export, Import, Peer};

/// Lookup-by-name over the objects the authorization path consults.
pub trait ResourceStore: Send + Sync {
    fn peer(&self, name: &str) -> Option<Peer>;
    fn export(&self, name: &str) -> Option<Export>;
    fn import(&self, name: &str) -> Option<Import>;
}

#[derive(Default)]
pub struct InMemoryStore {
    peers: DashMap<String, Peer>,
    exports: DashMap<String, Export>,
    imports: DashMap<String, Import>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_peer(&self, peer: Peer) {
        self.peers.insert(peer.name.clone(), peer);
    }

    pub fn remove_peer(&self, name: &str) -> Option<Peer> {
        self.peers.remove(name).map(|(_, p)| p)
    }

    pub fn upsert_export(&self, export: Export) {
        self.exports.insert(export.name.clone(), export);
    }

    pub fn remove_export(&self, name: &str) -> Option<Export> {
        self.exports.remove(name).map(|(_, e)| e)
    }

    pub fn upsert_import(&self, import: Import) {
        self.imports.insert(import.name.clone(), import);
    }

    pub fn remove_import(&self, name: &str) -> Option<Import> {
        self.imports.remove(name).map(|(_, i)| i)
    }
}

impl ResourceStore for InMemoryStore {
    fn peer(&self, name: &str) -> Option<Peer> {
        self.peers.get(name).map(|r| r.value().clone())
    }

    fn export(&self, name: &str) -> Option<Export> {
        self.exports.get(name).map(|r| r.value().clone())
    }

    fn import(&self, name: &str) -> Option<Import> {
        self.imports.get(name).map(|r| r.value().clone())
    }
}
