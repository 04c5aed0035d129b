pub mod loader;
pub mod profile;
pub mod schema;

pub use loader::{build_settings, load_config, load_config_from_str, ServerSettings, Settings};
pub use profile::{DocumentProfile, ProfileTable, RetryPolicy, SensitivityRange};
pub use schema::{
    Config, DocumentProfileConfig, DocumentProfiles, NotificationConfig, OcrSettings,
    RegionSettings, ServerConfig,
};
