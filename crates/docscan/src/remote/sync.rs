use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info, warn};

use crate::config::profile::{DocumentProfile, RetryPolicy};
use crate::record::DocumentRecord;
use crate::remote::client::{DomainTerm, RemoteStore};
use crate::remote::error::{RemoteError, SyncError};
use crate::remote::xmlrpc::Value;

pub const ATTACHMENT_OBJECT: &str = "ir.attachment";
pub const DOCUMENT_OBJECT: &str = "documents.document";

/// Reconciles records with the remote store: look the identity up, then
/// attach the scanned file to the record found.
///
/// Ids written to a record are never requested again, so repeated calls on
/// the same record are free. The session uid is obtained on first use and
/// reused for the rest of the run.
pub struct RemoteSync<S> {
    store: S,
    uid: Option<i64>,
}

impl<S: RemoteStore> RemoteSync<S> {
    pub fn new(store: S) -> Self {
        Self { store, uid: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session_uid(&self) -> Option<i64> {
        self.uid
    }

    /// Looks the record's identity up by name and stores the id on success.
    ///
    /// A missing identity fails straight away. "Not found" and a name
    /// mismatch end the call without retrying; transport errors are retried
    /// according to the profile's policy.
    pub fn resolve_record_id(
        &mut self,
        doc: &mut DocumentRecord,
        profile: &DocumentProfile,
    ) -> Result<i64, SyncError> {
        if doc.remote_record_id() > 0 {
            return Ok(doc.remote_record_id());
        }
        if doc.identity().is_empty() {
            return Err(SyncError::MissingIdentity);
        }

        let name = doc.identity().to_string();
        let domain = [DomainTerm::equals("name", name.as_str())];
        let store = &self.store;
        let cached = &mut self.uid;

        let found = retry(profile.retry, "search", || {
            let uid = session(store, &mut *cached)?;
            store.search(uid, &profile.remote_object, &domain)
        });

        let result = found.and_then(|records| match records.into_iter().next() {
            None => Err(SyncError::NotFound(name.clone())),
            Some(record) if record.name != name => Err(SyncError::Mismatch {
                expected: name.clone(),
                found: record.name,
            }),
            Some(record) => Ok(record.id),
        });

        match result {
            Ok(id) => {
                doc.set_remote_record_id(id);
                info!("{} {} has id: {}", profile.remote_object, name, id);
                Ok(doc.remote_record_id())
            }
            Err(e) => {
                warn!("Could not resolve {} {}: {}", profile.remote_object, name, e);
                doc.mark_sync_failed();
                Err(e)
            }
        }
    }

    /// Uploads the file as an attachment of the resolved record and returns
    /// the attachment id.
    ///
    /// When the profile names a folder, a document-management entry is
    /// linked to the attachment as well; failing that step is logged but does
    /// not undo the upload.
    pub fn try_upload_attachment(
        &mut self,
        doc: &mut DocumentRecord,
        profile: &DocumentProfile,
    ) -> Result<i64, SyncError> {
        if doc.remote_attachment_id() > 0 {
            return Ok(doc.remote_attachment_id());
        }

        let record_id = self.resolve_record_id(doc, profile)?;
        let data = std::fs::read(doc.source_path())?;

        let values = attachment_values(doc, profile, record_id, STANDARD.encode(&data));
        let store = &self.store;
        let cached = &mut self.uid;

        let attachment_id = match retry(profile.retry, "attachment upload", || {
            let uid = session(store, &mut *cached)?;
            store.create(uid, ATTACHMENT_OBJECT, values.clone())
        }) {
            Ok(id) => id,
            Err(e) => {
                warn!("Attachment upload for {} failed: {}", doc.identity(), e);
                doc.mark_sync_failed();
                return Err(e);
            }
        };
        doc.set_remote_attachment_id(attachment_id);
        info!(
            "{} {} has attachment id: {}",
            profile.remote_object,
            doc.identity(),
            attachment_id
        );

        if let Some(folder_id) = profile.folder_id {
            let mut values = BTreeMap::new();
            values.insert("attachment_id".to_string(), Value::Int(attachment_id));
            values.insert("folder_id".to_string(), Value::Int(folder_id));
            values.insert("active".to_string(), Value::Bool(true));

            match retry(profile.retry, "document entry", || {
                let uid = session(store, &mut *cached)?;
                store.create(uid, DOCUMENT_OBJECT, values.clone())
            }) {
                Ok(document_id) => {
                    doc.set_remote_document_id(document_id);
                    debug!("Attachment {} filed as document {}", attachment_id, document_id);
                }
                Err(e) => warn!(
                    "Could not file attachment {} in folder {}: {}",
                    attachment_id, folder_id, e
                ),
            }
        }

        Ok(doc.remote_attachment_id())
    }

    /// Like [`RemoteSync::try_upload_attachment`], but every failure
    /// (including a missing record id) yields 0.
    pub fn upload_attachment(&mut self, doc: &mut DocumentRecord, profile: &DocumentProfile) -> i64 {
        match self.try_upload_attachment(doc, profile) {
            Ok(id) => id,
            Err(e) => {
                debug!("No attachment for {}: {}", doc.file_name(), e);
                0
            }
        }
    }
}

fn session<S: RemoteStore>(store: &S, uid: &mut Option<i64>) -> Result<i64, RemoteError> {
    if let Some(uid) = *uid {
        return Ok(uid);
    }
    let fresh = store.authenticate()?;
    debug!("Authenticated with uid {}", fresh);
    *uid = Some(fresh);
    Ok(fresh)
}

fn retry<T>(
    policy: RetryPolicy,
    what: &str,
    mut op: impl FnMut() -> Result<T, RemoteError>,
) -> Result<T, SyncError> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(SyncError::RetriesExhausted {
                    attempts: attempt,
                    source: e,
                })
            }
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what, attempt, policy.max_attempts, e, policy.backoff
                );
                std::thread::sleep(policy.backoff);
                attempt += 1;
            }
        }
    }
}

fn attachment_values(
    doc: &DocumentRecord,
    profile: &DocumentProfile,
    record_id: i64,
    encoded: String,
) -> BTreeMap<String, Value> {
    let original = doc
        .source_path()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut values = BTreeMap::new();
    values.insert(
        "name".to_string(),
        Value::from(format!("{}_{}", doc.identity().replace('/', "-"), original)),
    );
    values.insert("res_model".to_string(), Value::from(profile.remote_object.as_str()));
    values.insert("res_id".to_string(), Value::Int(record_id));
    // `datas` is base64 text, not an XML-RPC binary.
    values.insert("datas".to_string(), Value::from(encoded));
    if let Some(tag_id) = profile.attachment_tag_id {
        values.insert("attachment_tag_id".to_string(), Value::Int(tag_id));
    }
    values
}
