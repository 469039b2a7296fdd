use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use rayon::prelude::*;

use super::{AdapterEvent, TransferControl};
use crate::chunking::plan::ChunkPlan;
use crate::domain::{FileId, SourceHandle};
use crate::error::{PondError, Result};

#[derive(Clone, Debug)]
pub struct StoredChunk {
    pub index: u64,
    pub blake3: [u8; 32],
    pub bytes: Vec<u8>,
}

struct Staged {
    total: u64,
    expected: [u8; 32],
    chunks: BTreeMap<u64, StoredChunk>,
}

/// In-process stand-in for a chunked upload server.
///
/// `send` slices a payload by its chunk plan, hashes the pieces in parallel and
/// keeps them; `finalize` reassembles and checks the whole-file digest.
/// With `reorder` set, acks come back sorted by chunk digest, which scrambles
/// index order the way a busy network would, but deterministically.
pub struct LoopbackTransfer {
    chunk_size: u64,
    reorder: bool,
    staged: Mutex<HashMap<FileId, Staged>>,
}

impl LoopbackTransfer {
    pub fn new(chunk_size: u64, reorder: bool) -> Self {
        Self {
            chunk_size,
            reorder,
            staged: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<FileId, Staged>>> {
        self.staged
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }

    /// Stores every chunk of `source` and returns the acks in delivery order.
    pub fn send(&self, id: FileId, source: &SourceHandle) -> Result<Vec<AdapterEvent>> {
        if !source.has_payload() {
            return Err(PondError::Format(format!(
                "{}: no bytes to send ({} byte file is metadata only)",
                source.name,
                source.size()
            )));
        }
        let plan = ChunkPlan::for_size(source.size(), self.chunk_size);
        let bytes = source.bytes();
        let ranges: Vec<_> = plan.ranges().collect();
        let mut chunks: Vec<StoredChunk> = ranges
            .par_iter()
            .map(|r| {
                let piece = &bytes[r.offset as usize..(r.offset + r.len) as usize];
                StoredChunk {
                    index: r.index,
                    blake3: *blake3::hash(piece).as_bytes(),
                    bytes: piece.to_vec(),
                }
            })
            .collect();
        if self.reorder {
            chunks.sort_by(|a, b| a.blake3.cmp(&b.blake3).then(a.index.cmp(&b.index)));
        }
        let acks = chunks
            .iter()
            .map(|c| AdapterEvent::ChunkProgress { id, index: c.index })
            .collect();

        let staged = Staged {
            total: plan.total_chunks(),
            expected: source.digest(),
            chunks: chunks.into_iter().map(|c| (c.index, c)).collect(),
        };
        self.lock()?.insert(id, staged);
        Ok(acks)
    }

    pub fn stored_chunks(&self, id: FileId) -> Result<Vec<StoredChunk>> {
        Ok(self
            .lock()?
            .get(&id)
            .map(|s| s.chunks.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Reassembles the upload; aborted, unknown or corrupt uploads come back
    /// as `Failed`.
    pub fn finalize(&self, id: FileId) -> Result<AdapterEvent> {
        let Some(staged) = self.lock()?.remove(&id) else {
            return Ok(AdapterEvent::Failed {
                id,
                reason: "no upload in progress (aborted?)".into(),
            });
        };
        if staged.chunks.len() as u64 != staged.total {
            return Ok(AdapterEvent::Failed {
                id,
                reason: format!(
                    "missing chunks: have {} of {}",
                    staged.chunks.len(),
                    staged.total
                ),
            });
        }
        let mut hasher = blake3::Hasher::new();
        for c in staged.chunks.values() {
            hasher.update(&c.bytes);
        }
        if *hasher.finalize().as_bytes() != staged.expected {
            return Ok(AdapterEvent::Failed {
                id,
                reason: "digest mismatch after reassembly".into(),
            });
        }
        Ok(AdapterEvent::Processed { id })
    }
}

impl TransferControl for LoopbackTransfer {
    fn abort(&self, id: FileId) {
        if let Ok(mut staged) = self.staged.lock() {
            if staged.remove(&id).is_some() {
                tracing::debug!(%id, "loopback upload discarded");
            }
        }
    }
}
