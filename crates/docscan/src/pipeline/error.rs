use thiserror::Error;

/// Reasons a record leaves the pipeline before being archived.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] crate::error::ExtractError),

    #[error("Archival failed: {0}")]
    Archive(#[from] crate::error::ArchiveError),
}

/// Non-fatal problems collected while processing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    ExtractionFailed(String),
    ExtractionExhausted { minimum: u32 },
    NotSynced,
    NotifyFailed(String),
}
