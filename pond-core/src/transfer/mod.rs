use serde::{Deserialize, Serialize};

use crate::domain::{FileId, SourceHandle};

/// What a transfer adapter reports back to the coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AdapterEvent {
    /// Ids are handed out by the session, so an add carries none.
    Added { source: SourceHandle },
    ChunkProgress { id: FileId, index: u64 },
    Processed { id: FileId },
    Failed { id: FileId, reason: String },
    Removed { id: FileId },
}

/// Back channel from the coordinator to whoever moves the bytes.
pub trait TransferControl: Send + Sync {
    /// Best effort; must not block on the transfer actually stopping.
    fn abort(&self, id: FileId);
}

/// Used when nobody needs to hear about aborts.
pub struct NoopControl;

impl TransferControl for NoopControl {
    fn abort(&self, _id: FileId) {}
}

pub mod loopback;
