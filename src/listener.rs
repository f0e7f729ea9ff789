//! The seam between the on-the-fly pipeline and a game-server frontend.

use std::sync::Arc;

/// A compiled, encrypted pack ready to be served: the zip bytes plus the
/// content key a client needs to read it. Cloning is cheap; the archive
/// bytes are shared.
#[derive(Clone, Debug)]
pub struct ServedPack {
    uuid: String,
    content_key: String,
    data: Arc<[u8]>,
}

impl ServedPack {
    pub fn new(uuid: String, content_key: String, data: Vec<u8>) -> Self {
        Self {
            uuid,
            content_key,
            data: data.into(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    /// The serialized pack zip.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Implemented by whatever serves packs to clients. The pipeline registers a
/// freshly built pack before removing the previous one, so implementations
/// must tolerate two packs (with distinct UUIDs) being registered during a
/// swap.
pub trait PackListener: Send + Sync {
    fn add_resource_pack(&self, pack: ServedPack);
    fn remove_resource_pack(&self, uuid: &str);
}
