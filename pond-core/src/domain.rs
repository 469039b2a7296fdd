// pond_core/src/domain.rs
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::plan::ChunkPlan;
use crate::filter::mime::guess_mime;

/// Session-scoped file identifier. Assigned once, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The payload behind a record plus its metadata.
///
/// Bytes sit behind an `Arc<[u8]>`, so a snapshot clone is a read-only view and
/// the buffer is freed once the last record or caller holding it goes away.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceHandle {
    pub name: String,
    pub mime: String,
    size: u64,
    payload: Arc<[u8]>,
}

impl SourceHandle {
    pub fn new(name: impl Into<String>, mime: Option<String>, payload: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let payload = payload.into();
        let mime = mime.unwrap_or_else(|| guess_mime(&name).to_string());
        Self {
            size: payload.len() as u64,
            name,
            mime,
            payload,
        }
    }

    /// A file whose bytes live elsewhere (already on the server).
    pub fn metadata_only(name: impl Into<String>, mime: Option<String>, size: u64) -> Self {
        let mut handle = Self::new(name, mime, Vec::<u8>::new());
        handle.size = size;
        handle
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn has_payload(&self) -> bool {
        self.payload.len() as u64 == self.size
    }

    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.payload).as_bytes()
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Queued,
    Uploading(ChunkPlan),
    Processed,
    Failed(String),
    Removed,
}

impl Stage {
    pub fn progress(&self) -> f64 {
        match self {
            Stage::Uploading(plan) => plan.progress(),
            Stage::Processed => 1.0,
            _ => 0.0,
        }
    }

    pub fn chunk_plan(&self) -> Option<&ChunkPlan> {
        match self {
            Stage::Uploading(plan) => Some(plan),
            _ => None,
        }
    }

    /// Queued or uploading: the adapter may still be moving bytes.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Stage::Queued | Stage::Uploading(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Queued => "queued",
            Stage::Uploading(_) => "uploading",
            Stage::Processed => "processed",
            Stage::Failed(_) => "failed",
            Stage::Removed => "removed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FileRecord {
    pub id: FileId,
    pub source: SourceHandle,
    pub stage: Stage,
}

impl FileRecord {
    pub fn progress(&self) -> f64 {
        self.stage.progress()
    }
}
