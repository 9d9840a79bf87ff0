//! Crate-wide error taxonomy.
//!
//! Only [`BitsError::Io`] is allowed to escape the core to the CLI. Every
//! other variant is absorbed by the orchestrator or the carver: the
//! offending chunk is skipped, a diagnostic is logged, and iteration
//! continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BitsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue structure error at offset {offset}: {message}")]
    QueueStructure { offset: usize, message: String },

    #[error("job decode error at offset {offset}: {message}")]
    JobDecode { offset: usize, message: String },

    #[error("file transfer decode error at offset {offset}: {message}")]
    FileDecode { offset: usize, message: String },

    #[error("metadata decode error at offset {offset}: {message}")]
    MetadataDecode { offset: usize, message: String },

    #[error("short input: needed {needed} byte(s), {available} available")]
    ShortInput { needed: usize, available: usize },

    #[error("expected {expected_len} constant byte(s), found a different sequence")]
    ConstantMismatch { expected_len: usize },

    #[error("invalid GUID bytes")]
    Guid,

    #[error("FILETIME value overflowed")]
    Time,

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, BitsError>;
