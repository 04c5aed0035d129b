//! Table-driven tests for configuration loading and validation.

use secrecy::ExposeSecret;
use serial_test::serial;
use tempfile::TempDir;

use docscan::config::{load_config, load_config_from_str};
use docscan::ConfigError;

/// Represents a single config loading test case.
struct ConfigTestCase {
    name: &'static str,
    /// Document section appended to a valid server section.
    documents: &'static str,
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const SERVERS: &str = r#"
servers:
  production:
    url: https://erp.example.com
    database: prod
    username: scanner
    password: hunter2
"#;

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]{3,6})"
    regions: [[1]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "no_documents",
        documents: "documents: {}\n",
        should_succeed: false,
        expected_error: Some("at least one document type"),
    },
    ConfigTestCase {
        name: "regex_without_group",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "/20[0-9]{2}/[0-9]+"
    regions: [[1]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
"#,
        should_succeed: false,
        expected_error: Some("capture group"),
    },
    ConfigTestCase {
        name: "minimum_above_start",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]+)"
    regions: [[1]]
    threshold-region-ignore: 20
    threshold-region-ignore-min: 40
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
"#,
        should_succeed: false,
        expected_error: Some("exceeds threshold-region-ignore"),
    },
    ConfigTestCase {
        name: "empty_region_group",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]+)"
    regions: [[1], []]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
"#,
        should_succeed: false,
        expected_error: Some("non-empty group"),
    },
    ConfigTestCase {
        name: "zero_region_rank",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]+)"
    regions: [[1, 0]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
"#,
        should_succeed: false,
        expected_error: Some("region rank 0"),
    },
    ConfigTestCase {
        name: "unknown_field",
        documents: r#"
documents:
  Invoice:
    file-name-match: "*.jpg"
    mime-types: [image/jpeg]
    ocr-regex: "(/20[0-9]{2}/[0-9]+)"
    regions: [[1]]
    threshold-region-ignore: 80
    threshold-region-ignore-min: 20
    threshold-region-ignore-decrement: 10
    odoo-object: account.move
    odoo-colour: blue
"#,
        should_succeed: false,
        expected_error: Some("odoo-colour"),
    },
];

#[test]
fn test_config_table() {
    for case in CONFIG_TESTS {
        let content = format!("{}{}", SERVERS, case.documents);
        let result = load_config_from_str(&content, "production");

        match (result, case.should_succeed) {
            (Ok(_), true) => {}
            (Err(e), false) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "{}: error '{}' does not mention '{}'",
                        case.name,
                        e,
                        expected
                    );
                }
            }
            (Ok(_), false) => panic!("{}: expected failure", case.name),
            (Err(e), true) => panic!("{}: unexpected error: {}", case.name, e),
        }
    }
}

#[test]
fn test_unknown_server_profile() {
    let content = format!("{}{}", SERVERS, CONFIG_TESTS[0].documents);
    let result = load_config_from_str(&content, "staging");
    assert!(matches!(result, Err(ConfigError::UnknownServer(name)) if name == "staging"));
}

#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("docscanner.conf");
    std::fs::write(&path, format!("{}{}", SERVERS, CONFIG_TESTS[0].documents)).unwrap();

    let settings = load_config(&path, "production").unwrap();
    assert_eq!(settings.server.url, "https://erp.example.com");
    assert_eq!(settings.profiles.len(), 1);

    let missing = load_config(temp_dir.path().join("missing.conf"), "production");
    assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
}

#[test]
#[serial]
fn test_password_from_environment() {
    let content = format!(
        "{}{}",
        r#"
servers:
  production:
    url: https://erp.example.com
    database: prod
    username: scanner
    password-env: DOCSCAN_TEST_PASSWORD
"#,
        CONFIG_TESTS[0].documents
    );

    std::env::set_var("DOCSCAN_TEST_PASSWORD", "from-env");
    let settings = load_config_from_str(&content, "production").unwrap();
    assert_eq!(settings.server.password.expose_secret(), "from-env");

    std::env::remove_var("DOCSCAN_TEST_PASSWORD");
    let result = load_config_from_str(&content, "production");
    assert!(matches!(result, Err(ConfigError::Secret(_))));
}
