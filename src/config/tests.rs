#![cfg(test)]

use crate::config::config::{Config, ConfigError};
use crate::config::DestinationConfig;

/// Parse a TOML string into a `Config` and run the project's validation logic.
fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let cfg = Config::from_toml(toml_str)?;
    cfg.validate()?;
    Ok(cfg)
}

#[test]
fn test_folder_config() {
    let source = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        r#"
        [source]
        path = "{}"

        [destination]
        type = "folder"
        path = "/tmp/out"

        [logging]
        log_level = "debug"
    "#,
        source.path().display()
    );

    let config = load_config_from_str(&toml).expect("config should validate");

    // defaults
    assert_eq!(config.cache.prefix, "cached");
    assert_eq!(config.cache.extension, "dcm");
    assert!(config.cache.root.ends_with("tmp/cache"));
    assert_eq!(config.logging.log_level, "debug");
    assert!(!config.logging.log_to_file);

    match config.destination {
        DestinationConfig::Folder { path, prefix } => {
            assert_eq!(path.to_str(), Some("/tmp/out"));
            assert_eq!(prefix, "export");
        }
        other => panic!("unexpected destination {:?}", other),
    }
}

#[test]
fn test_pacs_config() {
    let source = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        r#"
        [source]
        path = "{}"

        [cache]
        root = "/var/tmp/courier"
        prefix = "stage"

        [destination]
        type = "pacs"
        local_aet = "COURIER"

        [destination.remote]
        ae_title = "ARCHIVE"
        host = "10.1.2.3"
        port = 104
    "#,
        source.path().display()
    );

    let config = load_config_from_str(&toml).expect("config should validate");
    assert_eq!(config.cache.prefix, "stage");
    assert_eq!(config.destination.kind(), "pacs");
    match config.destination {
        DestinationConfig::Pacs { local_aet, remote } => {
            assert_eq!(local_aet, "COURIER");
            assert_eq!(remote.ae_title, "ARCHIVE");
            assert_eq!(remote.port, 104);
            assert_eq!(remote.connect_timeout_ms, None);
        }
        other => panic!("unexpected destination {:?}", other),
    }
}

#[test]
fn test_missing_source_rejected() {
    let toml = r#"
        [source]
        path = "/definitely/not/a/real/source/dir"

        [destination]
        type = "folder"
        path = "/tmp/out"
    "#;

    assert!(matches!(
        load_config_from_str(toml),
        Err(ConfigError::InvalidSource(_))
    ));
}

#[test]
fn test_invalid_pacs_fields_rejected() {
    let source = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        r#"
        [source]
        path = "{}"

        [destination]
        type = "pacs"
        local_aet = "THIS_AE_TITLE_IS_TOO_LONG"

        [destination.remote]
        ae_title = "ARCHIVE"
        host = "10.1.2.3"
        port = 104
    "#,
        source.path().display()
    );
    assert!(matches!(
        load_config_from_str(&toml),
        Err(ConfigError::InvalidPacs(_))
    ));
}

#[test]
fn test_unknown_destination_type_is_parse_error() {
    let toml = r#"
        [source]
        path = "/tmp"

        [destination]
        type = "ftp"
        path = "/tmp/out"
    "#;
    assert!(matches!(
        Config::from_toml(toml),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_export_prefix_cannot_escape_destination() {
    let source = tempfile::tempdir().expect("tempdir");
    for prefix in ["../x", "sub/export", "..\\\\x", ""] {
        let toml = format!(
            r#"
            [source]
            path = "{}"

            [destination]
            type = "folder"
            path = "/tmp/out"
            prefix = "{}"
        "#,
            source.path().display(),
            prefix
        );
        assert!(
            matches!(
                load_config_from_str(&toml),
                Err(ConfigError::InvalidExportPrefix)
            ),
            "prefix {:?} should be rejected",
            prefix
        );
    }
}

#[test]
fn test_cache_extension_cannot_contain_separators() {
    let source = tempfile::tempdir().expect("tempdir");
    for extension in ["dcm/../../x", "tar.gz"] {
        let toml = format!(
            r#"
            [source]
            path = "{}"

            [cache]
            extension = "{}"

            [destination]
            type = "folder"
            path = "/tmp/out"
        "#,
            source.path().display(),
            extension
        );
        assert!(matches!(
            load_config_from_str(&toml),
            Err(ConfigError::InvalidExtension)
        ));
    }
}
