use std::path::Path;

use tracing::debug;

use crate::config::profile::{DocumentProfile, ProfileTable};

/// Maps a file to its document-type profile.
pub struct DocumentClassifier {
    profiles: ProfileTable,
}

impl DocumentClassifier {
    pub fn new(profiles: ProfileTable) -> Self {
        Self { profiles }
    }

    /// First profile, in declaration order, whose name pattern matches the
    /// path and whose media types include `media_type`.
    pub fn classify(&self, path: &Path, media_type: &str) -> Option<&DocumentProfile> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.matches_name(path) && p.accepts_media_type(media_type));

        if let Some(profile) = profile {
            debug!(
                "File: {} mime-type: {} document-type: {}",
                crate::sanitize::redact_path(path),
                media_type,
                profile.name
            );
        }

        profile
    }

    pub fn profile(&self, name: &str) -> Option<&DocumentProfile> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile::RetryPolicy;
    use crate::config::schema::DocumentProfileConfig;
    use std::time::Duration;

    fn profile(name: &str, pattern: &str, mime_types: &[&str]) -> DocumentProfile {
        let raw = DocumentProfileConfig {
            file_name_match: pattern.to_string(),
            mime_types: mime_types.iter().map(|m| m.to_string()).collect(),
            ocr_regex: "([0-9]+)".to_string(),
            regions: vec![vec![1]],
            threshold_region_ignore: 80,
            threshold_region_ignore_min: 20,
            threshold_region_ignore_decrement: 10,
            odoo_object: "account.move".to_string(),
            odoo_sequence: String::new(),
            odoo_attachment_tag_id: None,
            odoo_folder_id: None,
            retry: None,
            retry_sleep: None,
        };
        DocumentProfile::compile(name, &raw, RetryPolicy::new(1, Duration::ZERO)).unwrap()
    }

    fn classifier() -> DocumentClassifier {
        DocumentClassifier::new(ProfileTable::new(vec![
            profile("Invoice", "*Invoice*.jpg", &["image/jpeg"]),
            profile("AnyJpeg", "*.jpg", &["image/jpeg"]),
            profile("Picking", "*.png", &["image/png"]),
        ]))
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = classifier();
        let result = classifier.classify(Path::new("1-Customer_Invoice-INV-2022-11528.jpg"), "image/jpeg");
        assert_eq!(result.map(|p| p.name.as_str()), Some("Invoice"));

        let result = classifier.classify(Path::new("receipt.jpg"), "image/jpeg");
        assert_eq!(result.map(|p| p.name.as_str()), Some("AnyJpeg"));
    }

    #[test]
    fn test_media_type_must_match() {
        let classifier = classifier();
        assert!(classifier.classify(Path::new("picking.png"), "image/jpeg").is_none());
        assert!(classifier.classify(Path::new("Invoice.jpg"), "application/pdf").is_none());
    }

    #[test]
    fn test_no_name_match() {
        let classifier = classifier();
        assert!(classifier.classify(Path::new("notes.txt"), "text/plain").is_none());
    }

    #[test]
    fn test_profile_lookup() {
        let classifier = classifier();
        assert!(classifier.profile("Picking").is_some());
        assert!(classifier.profile("Missing").is_none());
        assert_eq!(classifier.profiles().len(), 3);
    }
}
