use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::secrets::PasswordSource;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Archive root. Relative paths are resolved against each file's directory.
    #[serde(default = "default_done_path")]
    pub done_path: PathBuf,
    #[serde(default)]
    pub statistics_file: Option<PathBuf>,
    #[serde(default = "default_retry")]
    pub retry: u32,
    /// Seconds to wait between remote retries.
    #[serde(default = "default_retry_sleep")]
    pub retry_sleep: u64,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub notification: Option<NotificationConfig>,
    pub servers: BTreeMap<String, ServerConfig>,
    pub documents: DocumentProfiles,
}

fn default_done_path() -> PathBuf {
    PathBuf::from("done")
}

fn default_retry() -> u32 {
    3
}

fn default_retry_sleep() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OcrSettings {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Explicit OpenMP thread limit for Tesseract. Defaults to cpus - 1.
    #[serde(default)]
    pub thread_limit: Option<usize>,
    #[serde(default)]
    pub regions: RegionSettings,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
            thread_limit: None,
            regions: RegionSettings::default(),
        }
    }
}

/// Tuning for text-block detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegionSettings {
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    /// Radius of the local-mean window used for adaptive thresholding.
    #[serde(default = "default_block_radius")]
    pub block_radius: u32,
    /// Offset subtracted from the local mean before comparing.
    #[serde(default = "default_threshold_offset")]
    pub threshold_offset: i16,
    /// Half-width of the square dilation kernel.
    #[serde(default = "default_dilate_radius")]
    pub dilate_radius: u8,
    #[serde(default = "default_dilate_iterations")]
    pub dilate_iterations: u32,
    /// Global threshold applied to a cropped region before OCR.
    #[serde(default = "default_crop_threshold")]
    pub crop_threshold: u8,
}

fn default_blur_sigma() -> f32 {
    1.7
}

fn default_block_radius() -> u32 {
    5
}

fn default_threshold_offset() -> i16 {
    30
}

fn default_dilate_radius() -> u8 {
    4
}

fn default_dilate_iterations() -> u32 {
    4
}

fn default_crop_threshold() -> u8 {
    120
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            blur_sigma: default_blur_sigma(),
            block_radius: default_block_radius(),
            threshold_offset: default_threshold_offset(),
            dilate_radius: default_dilate_radius(),
            dilate_iterations: default_dilate_iterations(),
            crop_threshold: default_crop_threshold(),
        }
    }
}

/// Where unreadable documents are handed off for mailing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotificationConfig {
    pub error_email: String,
    #[serde(default = "default_error_message")]
    pub error_mail_message: String,
    pub spool_directory: PathBuf,
}

fn default_error_message() -> String {
    "The attached document could not be read automatically.".to_string()
}

/// A named remote-service profile (`--server`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    #[serde(flatten)]
    pub password: PasswordSource,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub retry_sleep: Option<u64>,
}

fn default_timeout_secs() -> u64 {
    60
}

/// Per-document-type extraction and sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DocumentProfileConfig {
    pub file_name_match: String,
    pub mime_types: Vec<String>,
    pub ocr_regex: String,
    /// Groups of region ranks tried in order. Rank `n` selects the n-th
    /// region from the end of the detected list.
    pub regions: Vec<Vec<i32>>,
    pub threshold_region_ignore: u32,
    pub threshold_region_ignore_min: u32,
    pub threshold_region_ignore_decrement: u32,
    pub odoo_object: String,
    #[serde(default)]
    pub odoo_sequence: String,
    #[serde(default)]
    pub odoo_attachment_tag_id: Option<i64>,
    #[serde(default)]
    pub odoo_folder_id: Option<i64>,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub retry_sleep: Option<u64>,
}

/// Document profiles in the order they appear in the config file.
///
/// Classification is first-match over this order, so a plain map would lose
/// information.
#[derive(Debug, Clone, Default)]
pub struct DocumentProfiles(pub Vec<(String, DocumentProfileConfig)>);

impl DocumentProfiles {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentProfileConfig)> {
        self.0.iter().map(|(name, profile)| (name.as_str(), profile))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DocumentProfiles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
        let mut profiles = Vec::with_capacity(mapping.len());

        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| D::Error::custom("document type names must be strings"))?
                .to_string();
            let profile: DocumentProfileConfig = serde_yaml::from_value(value)
                .map_err(|e| D::Error::custom(format!("document type '{}': {}", name, e)))?;
            profiles.push((name, profile));
        }

        Ok(Self(profiles))
    }
}

impl Serialize for DocumentProfiles {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(name, profile)| (name, profile)))
    }
}
