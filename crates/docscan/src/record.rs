use std::path::{Path, PathBuf};

use crate::categorizer::DocumentClassifier;
use crate::config::profile::DocumentProfile;
use crate::error::ExtractError;
use crate::media::MediaSniffer;
use crate::processor::identity::{IdentityResolver, RegionSource};
use crate::stats::RankStatistics;

/// Where a record stands with respect to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unidentified,
    Identified,
    Resolved,
    Attached,
    Failed,
}

/// One discovered file on its way through the pipeline.
///
/// Derived values (media type, document type, identity) are computed on first
/// access and cached. The identity can only be written by the identity
/// resolver and is cleared by [`DocumentRecord::reset`] or a sensitivity
/// change.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    source_path: PathBuf,
    media_type: Option<String>,
    document_type: Option<String>,
    identity: String,
    sensitivity: u32,
    remote_record_id: i64,
    remote_attachment_id: i64,
    remote_document_id: i64,
    notified_by_email: bool,
    sync_failed: bool,
}

impl DocumentRecord {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| ExtractError::UnreadableSource {
            path: path.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_file() {
            return Err(ExtractError::UnreadableSource {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        Ok(Self {
            source_path: path.to_path_buf(),
            media_type: None,
            document_type: None,
            identity: String::new(),
            sensitivity: 0,
            remote_record_id: 0,
            remote_attachment_id: 0,
            remote_document_id: 0,
            notified_by_email: false,
            sync_failed: false,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn file_name(&self) -> String {
        crate::sanitize::redact_path(&self.source_path)
    }

    pub fn media_type(&mut self, sniffer: &dyn MediaSniffer) -> Result<&str, ExtractError> {
        if self.media_type.is_none() {
            self.media_type = Some(sniffer.sniff(&self.source_path)?);
        }
        Ok(self.media_type.as_deref().unwrap_or_default())
    }

    /// The media type if it has already been sniffed.
    pub fn known_media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Classifies the record once; an empty string means no profile matched.
    ///
    /// A successful classification also seeds the sensitivity with the
    /// profile's starting value.
    pub fn document_type(
        &mut self,
        classifier: &DocumentClassifier,
        sniffer: &dyn MediaSniffer,
    ) -> Result<&str, ExtractError> {
        if self.document_type.is_none() {
            let media_type = self.media_type(sniffer)?.to_string();
            let resolved = match classifier.classify(&self.source_path, &media_type) {
                Some(profile) => {
                    self.sensitivity = profile.sensitivity.start;
                    profile.name.clone()
                }
                None => String::new(),
            };
            self.document_type = Some(resolved);
        }
        Ok(self.document_type.as_deref().unwrap_or_default())
    }

    /// The document type if classification has already run.
    pub fn known_document_type(&self) -> Option<&str> {
        self.document_type.as_deref()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the identity, reading it off `source` first if it is empty.
    pub fn resolve_identity(
        &mut self,
        resolver: &IdentityResolver,
        profile: &DocumentProfile,
        source: &mut dyn RegionSource,
        stats: Option<&mut RankStatistics>,
    ) -> Result<&str, ExtractError> {
        resolver.resolve(self, profile, source, stats)
    }

    pub(crate) fn accept_identity(&mut self, identity: String) {
        self.identity = identity;
    }

    /// Clears the identity so the next resolution re-reads the file.
    pub fn reset(&mut self) {
        self.identity.clear();
    }

    pub fn sensitivity(&self) -> u32 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: u32) {
        self.sensitivity = sensitivity;
        self.reset();
    }

    pub fn remote_record_id(&self) -> i64 {
        self.remote_record_id
    }

    pub fn remote_attachment_id(&self) -> i64 {
        self.remote_attachment_id
    }

    pub fn remote_document_id(&self) -> i64 {
        self.remote_document_id
    }

    pub(crate) fn set_remote_record_id(&mut self, id: i64) {
        if self.remote_record_id == 0 && id > 0 {
            self.remote_record_id = id;
        }
    }

    pub(crate) fn set_remote_attachment_id(&mut self, id: i64) {
        if self.remote_attachment_id == 0 && self.remote_record_id > 0 && id > 0 {
            self.remote_attachment_id = id;
        }
    }

    pub(crate) fn set_remote_document_id(&mut self, id: i64) {
        if self.remote_document_id == 0 && self.remote_attachment_id > 0 && id > 0 {
            self.remote_document_id = id;
        }
    }

    pub fn notified_by_email(&self) -> bool {
        self.notified_by_email
    }

    pub(crate) fn mark_notified(&mut self) {
        self.notified_by_email = true;
    }

    pub(crate) fn mark_sync_failed(&mut self) {
        self.sync_failed = true;
    }

    pub(crate) fn relocate(&mut self, new_path: PathBuf) {
        self.source_path = new_path;
    }

    pub fn sync_state(&self) -> SyncState {
        if self.remote_attachment_id > 0 {
            SyncState::Attached
        } else if self.sync_failed && !self.identity.is_empty() {
            SyncState::Failed
        } else if self.remote_record_id > 0 {
            SyncState::Resolved
        } else if !self.identity.is_empty() {
            SyncState::Identified
        } else {
            SyncState::Unidentified
        }
    }
}
