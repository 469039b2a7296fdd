use serde::{Deserialize, Serialize};

use crate::error::{PondError, Result};

pub const DEFAULT_CHUNK_SIZE: u64 = 5_000_000;
pub const DEFAULT_LABEL_IDLE: &str = "Drag & Drop your files or Browse";

/// A file that already lives on the server when the widget is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialFile {
    pub name: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    /// MIME patterns handed to the accept filter; empty accepts everything.
    pub accepted_file_types: Vec<String>,
    pub allow_multiple: bool,
    pub max_files: usize,
    /// Bytes per chunk handed to the transfer adapter.
    pub chunk_size: u64,
    /// Keep processed files visible; captured once when the session is built.
    pub retain_after_processing: bool,
    /// Seeded as already-processed records, only when retention is on.
    pub initial_files: Vec<InitialFile>,
    pub disabled: bool,
    pub label_idle: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            accepted_file_types: Vec::new(),
            allow_multiple: false,
            max_files: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retain_after_processing: false,
            initial_files: Vec::new(),
            disabled: false,
            label_idle: DEFAULT_LABEL_IDLE.to_string(),
        }
    }
}

impl UploadOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(PondError::InvalidConfig("maxFiles must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(PondError::InvalidConfig("chunkSize must be positive".into()));
        }
        if !self.allow_multiple && self.max_files != 1 {
            return Err(PondError::InvalidConfig(format!(
                "maxFiles is {} but allowMultiple is off (must be 1)",
                self.max_files
            )));
        }
        if let Some(bad) = self
            .accepted_file_types
            .iter()
            .find(|p| p.trim().is_empty())
        {
            return Err(PondError::InvalidConfig(format!(
                "empty accepted file type pattern {bad:?}"
            )));
        }
        if self.retain_after_processing && self.initial_files.len() > self.max_files {
            return Err(PondError::InvalidConfig(format!(
                "{} initial files exceed maxFiles {}",
                self.initial_files.len(),
                self.max_files
            )));
        }
        Ok(())
    }
}
