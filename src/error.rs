use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IntakeError {
    #[error("document is empty")]
    #[diagnostic(help("the input file contains no bytes"))]
    EmptyDocument,

    #[error("document is unreadable: {0}")]
    UnreadableDocument(String),

    #[error("failed to read document bytes for hashing: {0}")]
    HashRead(String),

    #[error("invalid file hash: {0}")]
    InvalidFileHash(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("submission id already exists: {0}")]
    #[diagnostic(help("two different documents for the same project were scanned within one second"))]
    SubmissionIdConflict(String),

    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("extraction worker failed: {0}")]
    Worker(String),
}
