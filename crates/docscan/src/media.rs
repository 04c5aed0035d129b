//! Media-type detection from file content.

use std::path::Path;

use tracing::debug;

use crate::error::ExtractError;

pub const OCTET_STREAM: &str = "application/octet-stream";

pub trait MediaSniffer {
    fn sniff(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Magic-byte detection with an extension-based fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl ContentSniffer {
    pub fn new() -> Self {
        Self
    }
}

impl MediaSniffer for ContentSniffer {
    fn sniff(&self, path: &Path) -> Result<String, ExtractError> {
        let detected = infer::get_from_path(path).map_err(|e| ExtractError::UnreadableSource {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mime = match detected {
            Some(kind) => kind.mime_type().to_string(),
            None => mime_guess::from_path(path)
                .first_raw()
                .unwrap_or(OCTET_STREAM)
                .to_string(),
        };

        debug!(
            "Sniffed {} as {}",
            crate::sanitize::redact_path(path),
            mime
        );
        Ok(mime)
    }
}
