use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to create spool directory '{path}': {source}")]
    SpoolDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode notification envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<NotifyError>,
    },
}
