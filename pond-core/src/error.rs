use thiserror::Error;

#[derive(Error, Debug)]
pub enum PondError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid options: {0}")]
    InvalidConfig(String),

    #[error("session is full: at most {max} file(s) allowed")]
    MaxFilesExceeded { max: usize },

    #[error("file {name:?} rejected: {reason}")]
    Rejected { name: String, reason: String },

    #[error("uploads are disabled")]
    Disabled,
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PondError>;
