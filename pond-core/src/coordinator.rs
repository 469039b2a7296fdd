use std::sync::Arc;

use crate::domain::{FileId, FileRecord, SourceHandle, Stage};
use crate::error::{PondError, Result};
use crate::filter::mime::MimeTypeFilter;
use crate::filter::{AcceptFilter, FilterPipeline};
use crate::options::UploadOptions;
use crate::session::{TransferEvent, UploadSession};
use crate::transfer::{AdapterEvent, NoopControl, TransferControl};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalCause {
    User,
    /// Processed while retention is off.
    Evicted,
}

/// Per-file completion notices for whoever renders the widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadNotice {
    Processed { id: FileId, name: String },
    Removed { id: FileId, cause: RemovalCause },
    Failed { id: FileId, reason: String },
    Rejected { name: String, reason: String },
}

/// Sole owner of the live session. Every adapter event funnels through here,
/// and the keep-or-evict decision after processing is made only here.
pub struct UploadCoordinator {
    session: UploadSession,
    options: UploadOptions,
    filters: FilterPipeline,
    control: Arc<dyn TransferControl>,
    notices: Vec<UploadNotice>,
}

impl UploadCoordinator {
    pub fn new(options: UploadOptions) -> Result<Self> {
        let session = UploadSession::from_options(&options)?;
        let mut filters = FilterPipeline::new();
        if !options.accepted_file_types.is_empty() {
            filters.push(Box::new(MimeTypeFilter::new(&options.accepted_file_types)));
        }
        Ok(Self {
            session,
            options,
            filters,
            control: Arc::new(NoopControl),
            notices: Vec::new(),
        })
    }

    pub fn with_control(mut self, control: Arc<dyn TransferControl>) -> Self {
        self.control = control;
        self
    }

    pub fn with_filter(mut self, filter: Box<dyn AcceptFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn label_idle(&self) -> &str {
        &self.options.label_idle
    }

    pub fn on_file_added(&mut self, source: SourceHandle) -> Result<FileId> {
        let added = if self.options.disabled {
            Err(PondError::Disabled)
        } else {
            self.filters
                .check(&source)
                .and_then(|_| self.session.add(source.clone()))
        };
        match added {
            Ok((next, record)) => {
                self.session = next;
                tracing::debug!(id = %record.id, name = %record.source.name, size = record.source.size(), "file queued");
                Ok(record.id)
            }
            Err(e) => {
                tracing::warn!(name = %source.name, error = %e, "file not accepted");
                self.notices.push(UploadNotice::Rejected {
                    name: source.name,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn on_chunk_progress(&mut self, id: FileId, chunk_index: u64) {
        self.session = self
            .session
            .advance(id, TransferEvent::ChunkAcked(chunk_index));
    }

    /// Hands back the source when the record stays in the session.
    pub fn on_processed(&mut self, id: FileId) -> Option<SourceHandle> {
        let next = self.session.advance(id, TransferEvent::Confirmed);
        let was_processed = matches!(self.stage(id), Some(Stage::Processed));
        let now_processed = matches!(
            next.get(id).map(|r| &r.stage),
            Some(Stage::Processed)
        );
        self.session = next;
        if was_processed || !now_processed {
            return None;
        }

        let name = self
            .session
            .get(id)
            .map(|r| r.source.name.clone())
            .unwrap_or_default();
        tracing::info!(%id, %name, "file processed");
        self.notices.push(UploadNotice::Processed { id, name });

        if self.session.retain_after_processing() {
            return self.session.get(id).map(|r| r.source.clone());
        }
        self.session = self.session.remove(id);
        tracing::info!(%id, "processed file evicted");
        self.notices.push(UploadNotice::Removed {
            id,
            cause: RemovalCause::Evicted,
        });
        None
    }

    pub fn on_transfer_failed(&mut self, id: FileId, reason: impl Into<String>) {
        let reason = reason.into();
        let next = self.session.advance(id, TransferEvent::Failed(reason.clone()));
        let failed = !matches!(self.stage(id), Some(Stage::Failed(_)))
            && matches!(next.get(id).map(|r| &r.stage), Some(Stage::Failed(_)));
        self.session = next;
        if failed {
            tracing::warn!(%id, %reason, "transfer failed");
            self.notices.push(UploadNotice::Failed { id, reason });
        }
    }

    /// Always honored. An in-flight transfer is told to abort; the record
    /// leaves the session right away either way.
    pub fn on_removed(&mut self, id: FileId) -> bool {
        let Some(stage) = self.stage(id) else {
            tracing::debug!(%id, "remove for unknown file ignored");
            return false;
        };
        if stage.is_in_flight() {
            tracing::debug!(%id, "aborting in-flight transfer");
            self.control.abort(id);
        }
        self.session = self.session.remove(id);
        tracing::info!(%id, "file removed");
        self.notices.push(UploadNotice::Removed {
            id,
            cause: RemovalCause::User,
        });
        true
    }

    pub fn current_files(&self) -> Vec<FileRecord> {
        self.session.snapshot()
    }

    pub fn take_notices(&mut self) -> Vec<UploadNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Routes one adapter event; returns the id assigned to an accepted add.
    pub fn dispatch(&mut self, event: AdapterEvent) -> Option<FileId> {
        match event {
            AdapterEvent::Added { source } => self.on_file_added(source).ok(),
            AdapterEvent::ChunkProgress { id, index } => {
                self.on_chunk_progress(id, index);
                None
            }
            AdapterEvent::Processed { id } => {
                self.on_processed(id);
                None
            }
            AdapterEvent::Failed { id, reason } => {
                self.on_transfer_failed(id, reason);
                None
            }
            AdapterEvent::Removed { id } => {
                self.on_removed(id);
                None
            }
        }
    }

    fn stage(&self, id: FileId) -> Option<Stage> {
        self.session.get(id).map(|r| r.stage.clone())
    }
}
