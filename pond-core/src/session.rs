use crate::chunking::plan::ChunkPlan;
use crate::domain::{FileId, FileRecord, SourceHandle, Stage};
use crate::error::{PondError, Result};
use crate::options::UploadOptions;

/// Something the transfer adapter reported about one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferEvent {
    Started,
    ChunkAcked(u64),
    /// Server confirmed the assembled file.
    Confirmed,
    Failed(String),
}

/// Immutable value describing which files exist and where each one stands.
///
/// Every operation returns a new session; the receiver is never changed, so a
/// caller can keep the previous value around while reconciling.
#[derive(Clone, Debug)]
pub struct UploadSession {
    files: Vec<FileRecord>,
    max_files: usize,
    chunk_size: u64,
    retain_after_processing: bool,
    next_id: u64,
}

impl UploadSession {
    pub fn new(max_files: usize, chunk_size: u64, retain_after_processing: bool) -> Self {
        Self {
            files: Vec::new(),
            max_files,
            chunk_size,
            retain_after_processing,
            next_id: 1,
        }
    }

    /// Validated session, seeded with the configured initial files when
    /// retention is on.
    pub fn from_options(opts: &UploadOptions) -> Result<Self> {
        opts.validate()?;
        let mut session = Self::new(
            opts.max_files,
            opts.chunk_size,
            opts.retain_after_processing,
        );
        if opts.initial_files.is_empty() {
            return Ok(session);
        }
        if !opts.retain_after_processing {
            tracing::warn!(
                count = opts.initial_files.len(),
                "initial files ignored: retainAfterProcessing is off"
            );
            return Ok(session);
        }
        for f in &opts.initial_files {
            let source = SourceHandle::metadata_only(&f.name, f.mime.clone(), f.size);
            let (next, _) = session.insert(source, Stage::Processed)?;
            session = next;
        }
        Ok(session)
    }

    pub fn retain_after_processing(&self) -> bool {
        self.retain_after_processing
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.files.iter().find(|r| r.id == id)
    }

    pub fn add(&self, source: SourceHandle) -> Result<(Self, FileRecord)> {
        self.insert(source, Stage::Queued)
    }

    fn insert(&self, source: SourceHandle, stage: Stage) -> Result<(Self, FileRecord)> {
        if self.files.len() >= self.max_files {
            return Err(PondError::MaxFilesExceeded {
                max: self.max_files,
            });
        }
        let record = FileRecord {
            id: FileId(self.next_id),
            source,
            stage,
        };
        let mut next = self.clone();
        next.next_id += 1;
        next.files.push(record.clone());
        Ok((next, record))
    }

    /// Unknown ids and transitions outside the lifecycle leave the session as is.
    pub fn advance(&self, id: FileId, event: TransferEvent) -> Self {
        let Some(pos) = self.files.iter().position(|r| r.id == id) else {
            tracing::debug!(%id, ?event, "event for unknown file ignored");
            return self.clone();
        };
        let record = &self.files[pos];
        match transition(&record.stage, &event, record.source.size(), self.chunk_size) {
            Some(stage) => {
                let mut next = self.clone();
                next.files[pos].stage = stage;
                next
            }
            None => {
                tracing::debug!(%id, stage = record.stage.label(), ?event, "stale event ignored");
                self.clone()
            }
        }
    }

    /// Drops the record (stage `Removed`) and releases its payload. Idempotent.
    pub fn remove(&self, id: FileId) -> Self {
        let mut next = self.clone();
        if let Some(pos) = next.files.iter().position(|r| r.id == id) {
            let mut gone = next.files.remove(pos);
            gone.stage = Stage::Removed;
            tracing::debug!(%id, name = %gone.source.name, stage = gone.stage.label(), "file left session");
        }
        next
    }

    /// Caller-owned copy of the file list, in insertion order.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.files.clone()
    }
}

fn transition(stage: &Stage, event: &TransferEvent, size: u64, chunk_size: u64) -> Option<Stage> {
    match (stage, event) {
        (Stage::Queued, TransferEvent::Started) => {
            Some(Stage::Uploading(ChunkPlan::for_size(size, chunk_size)))
        }
        // First ack doubles as the start signal.
        (Stage::Queued, TransferEvent::ChunkAcked(index)) => {
            let mut plan = ChunkPlan::for_size(size, chunk_size);
            plan.ack(*index).then_some(Stage::Uploading(plan))
        }
        (Stage::Uploading(plan), TransferEvent::ChunkAcked(index)) => {
            let mut plan = plan.clone();
            plan.ack(*index).then_some(Stage::Uploading(plan))
        }
        // Confirmation supersedes progress that has not shown up yet.
        (Stage::Queued | Stage::Uploading(_), TransferEvent::Confirmed) => Some(Stage::Processed),
        (Stage::Uploading(_), TransferEvent::Failed(reason)) => Some(Stage::Failed(reason.clone())),
        _ => None,
    }
}
