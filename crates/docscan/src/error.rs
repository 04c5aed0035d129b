use std::path::PathBuf;
use thiserror::Error;

use crate::notify::NotifyError;
use crate::remote::SyncError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum DocscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Remote sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatisticsError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid pattern in document type '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Server profile '{0}' is not defined in the config file")]
    UnknownServer(String),

    #[error("Failed to resolve server password: {0}")]
    Secret(#[from] SecretError),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to read source '{path}': {source}")]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image '{path}': {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("No document type profile matches '{0}'")]
    UnclassifiedDocument(PathBuf),

    #[error("No identity found in '{path}' down to sensitivity {minimum}")]
    ExtractionExhausted { path: PathBuf, minimum: u32 },

    #[error("No text regions detected")]
    NoRegions,

    #[error("Region index {index} out of range for {len} regions")]
    RegionOutOfRange { index: i32, len: usize },

    #[error("OCR failed: {0}")]
    OcrFailed(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Identity '{0}' does not have the form type/year/number")]
    Layout(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum StatisticsError {
    #[error("Failed to read statistics file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write statistics file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed statistics file: {0}")]
    Format(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DocscanError>;
