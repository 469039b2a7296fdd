#![forbid(unsafe_code)]

pub mod error;
pub mod options;

pub mod util {
    pub mod varint;
}

pub mod chunking {
    pub mod plan;
}

pub mod domain;
pub mod filter;
pub mod session;
pub mod coordinator;
pub mod transfer;
pub mod journal;

// Re-exports: stable API surface
pub use coordinator::{RemovalCause, UploadCoordinator, UploadNotice};
pub use domain::{FileId, FileRecord, SourceHandle, Stage};
pub use options::{InitialFile, UploadOptions};
pub use session::{TransferEvent, UploadSession};
pub use transfer::AdapterEvent;
