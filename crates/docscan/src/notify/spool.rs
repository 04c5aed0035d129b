use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::profile::RetryPolicy;
use crate::config::schema::NotificationConfig;
use crate::media::OCTET_STREAM;
use crate::notify::{Notifier, NotifyError};
use crate::record::DocumentRecord;

/// Metadata written next to a spooled document for the external mailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub attachment: String,
    pub media_type: String,
    pub created_at: DateTime<Utc>,
}

/// Drops failed documents into a spool directory: the raw file plus a JSON
/// envelope with the same stem.
pub struct SpoolNotifier {
    config: NotificationConfig,
    retry: RetryPolicy,
}

impl SpoolNotifier {
    pub fn new(config: NotificationConfig, retry: RetryPolicy) -> Self {
        Self { config, retry }
    }

    pub fn spool_directory(&self) -> &Path {
        &self.config.spool_directory
    }

    fn envelope(&self, doc: &DocumentRecord, attachment: &str, now: DateTime<Utc>) -> Envelope {
        Envelope {
            recipient: self.config.error_email.clone(),
            subject: format!("Document failed to scan: {}", attachment),
            message: self.config.error_mail_message.clone(),
            attachment: attachment.to_string(),
            media_type: doc.known_media_type().unwrap_or(OCTET_STREAM).to_string(),
            created_at: now,
        }
    }

    fn spool(&self, doc: &DocumentRecord, content: &[u8]) -> Result<PathBuf, NotifyError> {
        let directory = &self.config.spool_directory;
        std::fs::create_dir_all(directory).map_err(|e| NotifyError::SpoolDirectory {
            path: directory.clone(),
            source: e,
        })?;

        let attachment = doc
            .source_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let now = Utc::now();
        let stem = format!("{}-{}", now.format("%Y%m%dT%H%M%S%.6f"), attachment);

        let document_path = directory.join(&stem);
        std::fs::write(&document_path, content).map_err(|e| NotifyError::Write {
            path: document_path.clone(),
            source: e,
        })?;

        let envelope_path = directory.join(format!("{}.json", stem));
        let envelope = serde_json::to_string_pretty(&self.envelope(doc, &attachment, now))?;
        std::fs::write(&envelope_path, envelope).map_err(|e| NotifyError::Write {
            path: envelope_path.clone(),
            source: e,
        })?;

        Ok(envelope_path)
    }
}

impl Notifier for SpoolNotifier {
    fn notify(&self, doc: &DocumentRecord, content: &[u8]) -> Result<bool, NotifyError> {
        let mut attempt = 1;
        loop {
            match self.spool(doc, content) {
                Ok(envelope) => {
                    info!(
                        "Queued {} for mailing to {} ({})",
                        doc.file_name(),
                        self.config.error_email,
                        crate::sanitize::redact_path(&envelope)
                    );
                    return Ok(true);
                }
                Err(e) if attempt >= self.retry.max_attempts => {
                    return Err(NotifyError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
                Err(e) => {
                    warn!(
                        "Failed to queue {} (attempt {}/{}): {}",
                        doc.file_name(),
                        attempt,
                        self.retry.max_attempts,
                        e
                    );
                    std::thread::sleep(self.retry.backoff);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DisabledNotifier;
    use std::time::Duration;
    use tempfile::TempDir;

    fn notifier(spool: &Path) -> SpoolNotifier {
        SpoolNotifier::new(
            NotificationConfig {
                error_email: "scans@example.com".to_string(),
                error_mail_message: "Please file this by hand.".to_string(),
                spool_directory: spool.to_path_buf(),
            },
            RetryPolicy::new(2, Duration::ZERO),
        )
    }

    fn scanned(dir: &Path) -> DocumentRecord {
        let path = dir.join("blurry.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();
        DocumentRecord::open(&path).unwrap()
    }

    #[test]
    fn test_spool_writes_document_and_envelope() {
        let temp_dir = TempDir::new().unwrap();
        let spool = temp_dir.path().join("spool");
        let doc = scanned(temp_dir.path());

        assert!(notifier(&spool).notify(&doc, b"jpeg bytes").unwrap());

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&spool)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        assert_eq!(entries.len(), 2);

        let document = entries.iter().find(|p| p.extension().is_some_and(|e| e == "jpg")).unwrap();
        assert_eq!(std::fs::read(document).unwrap(), b"jpeg bytes");

        let json = entries.iter().find(|p| p.extension().is_some_and(|e| e == "json")).unwrap();
        let envelope: Envelope =
            serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(envelope.recipient, "scans@example.com");
        assert_eq!(envelope.subject, "Document failed to scan: blurry.jpg");
        assert_eq!(envelope.media_type, OCTET_STREAM);
    }

    #[test]
    fn test_spool_failure_is_retried_then_reported() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the spool directory should be.
        let spool = temp_dir.path().join("spool");
        std::fs::write(&spool, b"").unwrap();
        let doc = scanned(temp_dir.path());

        let result = notifier(&spool).notify(&doc, b"jpeg bytes");
        assert!(matches!(
            result,
            Err(NotifyError::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[test]
    fn test_disabled_notifier() {
        let temp_dir = TempDir::new().unwrap();
        let doc = scanned(temp_dir.path());
        assert!(!DisabledNotifier.notify(&doc, b"").unwrap());
    }
}
