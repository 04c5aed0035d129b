//! Hand-off of documents that could not be processed.
//!
//! The mail transport itself lives outside this crate; a [`Notifier`] only
//! has to get the document and a description of the failure to it.

pub mod error;
pub mod spool;

pub use error::NotifyError;
pub use spool::{Envelope, SpoolNotifier};

use crate::record::DocumentRecord;

pub trait Notifier {
    /// Hands `doc` and its raw bytes off for mailing. Returns `Ok(true)` when
    /// the document was passed on, `Ok(false)` when notifications are off.
    fn notify(&self, doc: &DocumentRecord, content: &[u8]) -> Result<bool, NotifyError>;
}

/// Used when no notification section is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn notify(&self, doc: &DocumentRecord, _content: &[u8]) -> Result<bool, NotifyError> {
        tracing::debug!("Notifications disabled, not sending {}", doc.file_name());
        Ok(false)
    }
}
