//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` struct owns a temporary scan directory and a config
//! written into it, and builds a [`Pipeline`] over in-memory fakes so that
//! no OCR engine or remote server is needed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use docscan::config::{load_config_from_str, Settings};
use docscan::remote::RemoteSync;
use docscan::{Archivist, DocumentClassifier, Pipeline, SpoolNotifier};

use super::fakes::{FakePages, FakeStore};

/// Enough of a JPEG header for content sniffing.
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

const BASE_CONFIG: &str = r#"
done-path: done
retry: 2
retry-sleep: 0
servers:
  test:
    url: http://localhost:8069
    database: test
    username: scanner
    password: secret
documents:
  Invoice:
    file-name-match: "*Invoice*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]{3,6})"
    regions: [[1, 2, 3]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 20
    odoo-object: account.move
    odoo-sequence: INV
"#;

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory scanned files are dropped into.
    pub scan_dir: PathBuf,
    /// Spool directory used when notifications are enabled.
    pub spool_dir: PathBuf,
    pub settings: Settings,
}

impl TestHarness {
    /// Harness without notifications.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Harness that spools unreadable documents for mailing.
    pub fn with_notifications() -> Self {
        Self::build(true)
    }

    fn build(notifications: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scan_dir = temp_dir.path().join("scans");
        let spool_dir = temp_dir.path().join("spool");
        std::fs::create_dir_all(&scan_dir).expect("Failed to create scan directory");

        let mut config = BASE_CONFIG.to_string();
        if notifications {
            config.push_str(&format!(
                "notification:\n  error-email: scans@example.com\n  spool-directory: {}\n",
                spool_dir.display()
            ));
        }
        let settings = load_config_from_str(&config, "test").expect("Failed to load test config");

        Self {
            temp_dir,
            scan_dir,
            spool_dir,
            settings,
        }
    }

    /// Writes a file into the scan directory and returns its path.
    pub fn write_scan(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.scan_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write scan");
        path
    }

    pub fn done_dir(&self) -> PathBuf {
        self.scan_dir.join("done")
    }

    pub fn pipeline(&self, pages: FakePages, store: FakeStore) -> Pipeline<FakeStore> {
        let pipeline = Pipeline::new(
            DocumentClassifier::new(self.settings.profiles.clone()),
            Box::new(pages),
            RemoteSync::new(store),
            Archivist::new(&self.settings.done_path),
        );

        match &self.settings.notification {
            Some(notification) => pipeline.with_notifier(Box::new(SpoolNotifier::new(
                notification.clone(),
                self.settings.retry,
            ))),
            None => pipeline,
        }
    }

    /// Files currently in the spool directory, sorted.
    pub fn spooled(&self) -> Vec<PathBuf> {
        list_files(&self.spool_dir)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}
