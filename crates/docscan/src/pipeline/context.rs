use std::path::PathBuf;

use crate::config::profile::DocumentProfile;
use crate::record::DocumentRecord;

use super::error::PipelineWarning;

pub struct PipelineContext {
    pub record: DocumentRecord,

    // Set by classification; guaranteed Some afterwards
    pub profile: Option<DocumentProfile>,

    // Upload result, 0 when nothing was attached
    pub attachment_id: i64,

    // Archive location, None when the file stayed in place
    pub archive_path: Option<PathBuf>,

    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(record: DocumentRecord) -> Self {
        Self {
            record,
            profile: None,
            attachment_id: 0,
            archive_path: None,
            warnings: Vec::new(),
        }
    }
}
