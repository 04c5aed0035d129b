use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::config::schema::DocumentProfileConfig;
use crate::error::ConfigError;

/// Largest region rank a profile may request. Rank `n` reads the n-th block
/// from the bottom of the page.
pub const MAX_REGION_RANK: i32 = 1000;

/// Start, floor and step of the region-size threshold back-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitivityRange {
    pub start: u32,
    pub minimum: u32,
    pub decrement: u32,
}

impl SensitivityRange {
    /// The next sensitivity to try after `current`, or `None` once a further
    /// step would drop below the minimum.
    pub fn next(&self, current: u32) -> Option<u32> {
        current
            .checked_sub(self.decrement)
            .filter(|next| *next >= self.minimum && self.decrement > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// A validated document-type profile with its patterns compiled.
#[derive(Debug, Clone)]
pub struct DocumentProfile {
    pub name: String,
    pub file_name_match: glob::Pattern,
    pub mime_types: Vec<String>,
    pub regex: Regex,
    pub region_groups: Vec<Vec<i32>>,
    pub sensitivity: SensitivityRange,
    pub remote_object: String,
    pub sequence: String,
    pub attachment_tag_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub retry: RetryPolicy,
}

impl DocumentProfile {
    pub fn compile(
        name: &str,
        raw: &DocumentProfileConfig,
        fallback_retry: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            name: name.to_string(),
            reason,
        };

        let regex = Regex::new(&raw.ocr_regex)
            .map_err(|e| invalid(format!("ocr-regex: {}", e)))?;
        if regex.captures_len() < 2 {
            return Err(invalid(
                "ocr-regex must contain a capture group for the document number".to_string(),
            ));
        }

        let file_name_match = glob::Pattern::new(&raw.file_name_match)
            .map_err(|e| invalid(format!("file-name-match: {}", e)))?;

        let validation = |message: String| ConfigError::Validation {
            message: format!("document type '{}': {}", name, message),
        };

        if raw.mime_types.is_empty() {
            return Err(validation("mime-types must not be empty".to_string()));
        }
        if raw.regions.is_empty() || raw.regions.iter().any(Vec::is_empty) {
            return Err(validation(
                "regions must contain at least one non-empty group".to_string(),
            ));
        }
        if let Some(rank) = raw
            .regions
            .iter()
            .flatten()
            .find(|rank| !(1..=MAX_REGION_RANK).contains(*rank))
        {
            return Err(validation(format!(
                "region rank {} is outside 1..={}",
                rank, MAX_REGION_RANK
            )));
        }
        if raw.threshold_region_ignore_decrement == 0 {
            return Err(validation(
                "threshold-region-ignore-decrement must be greater than 0".to_string(),
            ));
        }
        if raw.threshold_region_ignore_min > raw.threshold_region_ignore {
            return Err(validation(format!(
                "threshold-region-ignore-min ({}) exceeds threshold-region-ignore ({})",
                raw.threshold_region_ignore_min, raw.threshold_region_ignore
            )));
        }
        if raw.odoo_object.trim().is_empty() {
            return Err(validation("odoo-object must not be empty".to_string()));
        }

        let retry = RetryPolicy::new(
            raw.retry.unwrap_or(fallback_retry.max_attempts),
            raw.retry_sleep
                .map(Duration::from_secs)
                .unwrap_or(fallback_retry.backoff),
        );
        if retry.max_attempts == 0 {
            return Err(validation("retry must be at least 1".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            file_name_match,
            mime_types: raw.mime_types.clone(),
            regex,
            region_groups: raw.regions.clone(),
            sensitivity: SensitivityRange {
                start: raw.threshold_region_ignore,
                minimum: raw.threshold_region_ignore_min,
                decrement: raw.threshold_region_ignore_decrement,
            },
            remote_object: raw.odoo_object.clone(),
            sequence: raw.odoo_sequence.clone(),
            attachment_tag_id: raw.odoo_attachment_tag_id,
            folder_id: raw.odoo_folder_id,
            retry,
        })
    }

    /// Path-style matching: a pattern without `/` is tested against the file
    /// name, otherwise against the whole path.
    pub fn matches_name(&self, path: &Path) -> bool {
        if self.file_name_match.as_str().contains('/') {
            return self.file_name_match.matches_path(path);
        }
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.file_name_match.matches(name))
    }

    pub fn accepts_media_type(&self, media_type: &str) -> bool {
        self.mime_types.iter().any(|m| m == media_type)
    }
}

/// All document profiles, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    profiles: Vec<DocumentProfile>,
}

impl ProfileTable {
    pub fn new(profiles: Vec<DocumentProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, name: &str) -> Option<&DocumentProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentProfile> {
        self.profiles.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
