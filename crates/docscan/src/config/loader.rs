use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::config::profile::{DocumentProfile, ProfileTable, RetryPolicy};
use crate::config::schema::{Config, NotificationConfig, OcrSettings, ServerConfig};
use crate::error::ConfigError;

/// Connection parameters for the selected server profile.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub name: String,
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

/// Fully validated runtime settings for one `--server` selection.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub profiles: ProfileTable,
    pub done_path: PathBuf,
    pub statistics_file: Option<PathBuf>,
    pub ocr: OcrSettings,
    pub notification: Option<NotificationConfig>,
    /// Server-level retry policy; profiles without their own inherit it.
    pub retry: RetryPolicy,
}

pub fn load_config<P: AsRef<Path>>(path: P, server: &str) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, server)
}

pub fn load_config_from_str(content: &str, server: &str) -> Result<Settings, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;
    build_settings(&config, server)
}

pub fn build_settings(config: &Config, server: &str) -> Result<Settings, ConfigError> {
    if config.documents.is_empty() {
        return Err(ConfigError::Validation {
            message: "at least one document type must be configured".to_string(),
        });
    }

    let server_config = config
        .servers
        .get(server)
        .ok_or_else(|| ConfigError::UnknownServer(server.to_string()))?;

    let retry = RetryPolicy::new(
        server_config.retry.unwrap_or(config.retry),
        Duration::from_secs(server_config.retry_sleep.unwrap_or(config.retry_sleep)),
    );
    if retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "retry must be at least 1".to_string(),
        });
    }

    let profiles = config
        .documents
        .iter()
        .map(|(name, raw)| DocumentProfile::compile(name, raw, retry))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(notification) = &config.notification {
        if notification.error_email.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "notification.error-email must not be empty".to_string(),
            });
        }
    }

    Ok(Settings {
        server: server_settings(server, server_config)?,
        profiles: ProfileTable::new(profiles),
        done_path: config.done_path.clone(),
        statistics_file: config.statistics_file.clone(),
        ocr: config.ocr.clone(),
        notification: config.notification.clone(),
        retry,
    })
}

fn server_settings(name: &str, raw: &ServerConfig) -> Result<ServerSettings, ConfigError> {
    if raw.url.trim().is_empty() || raw.database.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: format!("server '{}': url and database are required", name),
        });
    }

    if !raw.password.is_configured() {
        return Err(ConfigError::Validation {
            message: format!(
                "server '{}': one of password, password-file or password-env is required",
                name
            ),
        });
    }

    Ok(ServerSettings {
        name: name.to_string(),
        url: raw.url.trim_end_matches('/').to_string(),
        database: raw.database.clone(),
        username: raw.username.clone(),
        password: raw.password.resolve()?,
        accept_invalid_certs: raw.accept_invalid_certs,
        timeout: Duration::from_secs(raw.timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const CONFIG: &str = r#"
done-path: /srv/scans/done
statistics-file: /var/lib/docscan/stats.yaml
retry: 4
retry-sleep: 2
servers:
  production:
    url: https://erp.example.com/
    database: prod
    username: scanner
    password: hunter2
  development:
    url: https://dev.example.com
    database: dev
    username: scanner
    password: devpass
    retry: 1
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg, image/png]
    ocr-regex: "(/20[0-9]{2}/[0-9]{3,6})"
    regions: [[1, 2, 3], [6, 7]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
    odoo-sequence: INV
  Picking:
    file-name-match: "*.png"
    mime-types: [image/png]
    ocr-regex: "(/OUT/[0-9]{5})"
    regions: [[1]]
    threshold-region-ignore: 50
    threshold-region-ignore-min: 50
    threshold-region-ignore-decrement: 5
    odoo-object: stock.picking
    odoo-sequence: WH
    retry: 9
"#;

    #[test]
    fn test_load_selects_server() {
        let settings = load_config_from_str(CONFIG, "production").unwrap();
        assert_eq!(settings.server.name, "production");
        assert_eq!(settings.server.url, "https://erp.example.com");
        assert_eq!(settings.server.database, "prod");
        assert_eq!(settings.server.password.expose_secret(), "hunter2");
        assert_eq!(settings.done_path, PathBuf::from("/srv/scans/done"));
    }

    #[test]
    fn test_profiles_keep_declaration_order() {
        let settings = load_config_from_str(CONFIG, "production").unwrap();
        let names: Vec<&str> = settings.profiles.names().collect();
        assert_eq!(names, vec!["Invoice", "Picking"]);
    }

    #[test]
    fn test_retry_resolution_order() {
        let settings = load_config_from_str(CONFIG, "production").unwrap();
        let invoice = settings.profiles.get("Invoice").unwrap();
        assert_eq!(invoice.retry.max_attempts, 4);
        assert_eq!(invoice.retry.backoff, Duration::from_secs(2));
        assert_eq!(settings.profiles.get("Picking").unwrap().retry.max_attempts, 9);

        let settings = load_config_from_str(CONFIG, "development").unwrap();
        assert_eq!(settings.profiles.get("Invoice").unwrap().retry.max_attempts, 1);
    }

    #[test]
    fn test_unknown_server() {
        let result = load_config_from_str(CONFIG, "staging");
        assert!(matches!(result, Err(ConfigError::UnknownServer(name)) if name == "staging"));
    }

    #[test]
    fn test_missing_key_fails_at_load() {
        let broken = CONFIG.replace("    odoo-object: stock.picking\n", "");
        let result = load_config_from_str(&broken, "production");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_profile_key_fails_at_load() {
        let broken = CONFIG.replace("odoo-sequence: WH", "odoo-sequense: WH");
        assert!(load_config_from_str(&broken, "production").is_err());
    }

    #[test]
    fn test_invalid_regex_fails_at_load() {
        let broken = CONFIG.replace("(/OUT/[0-9]{5})", "(/OUT/[0-9");
        let result = load_config_from_str(&broken, "production");
        assert!(matches!(result, Err(ConfigError::InvalidPattern { name, .. }) if name == "Picking"));
    }

    #[test]
    fn test_missing_password_fails_at_load() {
        let broken = CONFIG.replace("    password: hunter2\n", "");
        let result = load_config_from_str(&broken, "production");
        assert!(matches!(result, Err(ConfigError::Validation { message }) if message.contains("password")));
    }

    #[test]
    fn test_read_missing_file() {
        let result = load_config("/nonexistent/docscanner.conf", "production");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
