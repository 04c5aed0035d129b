use thiserror::Error;

/// Failure talking to the remote store. Every variant is retryable.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

impl From<quick_xml::Error> for RemoteError {
    fn from(e: quick_xml::Error) -> Self {
        RemoteError::Protocol(format!("XML parsing error: {}", e))
    }
}

/// Why a record could not be reconciled with the remote store.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Document has no identity to look up")]
    MissingIdentity,

    #[error("No remote record named '{0}'")]
    NotFound(String),

    #[error("Remote lookup for '{expected}' returned '{found}'")]
    Mismatch { expected: String, found: String },

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to read attachment payload: {0}")]
    UnreadableSource(#[from] std::io::Error),
}
