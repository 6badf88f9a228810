use crate::core::{Result, SchemaAdminError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured DSN.
pub const DSN_ENV: &str = "SCHEMA_ADMIN_DSN";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "SCHEMA_ADMIN_CONFIG";

const DEFAULT_LOG_FILTER: &str = "warn";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub connection: Option<ConnectionConfig>,
    pub identifiers: Option<IdentifiersConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Connection settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub dsn: Option<String>,
}

/// Identifier policy settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentifiersConfig {
    pub strict: Option<bool>,
}

/// Logging settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `schema_admin=debug`
    pub filter: Option<String>,
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SchemaAdminError::Config(e.to_string()))
    }

    /// Finds and loads the configuration.
    ///
    /// An explicitly named file (`--config` or `$SCHEMA_ADMIN_CONFIG`) must
    /// exist. Otherwise `<config dir>/schema-admin/config.toml` is read when
    /// present, and the default configuration used when it is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return load_config(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => load_config(path),
            _ => Ok(Config::default()),
        }
    }

    /// The DSN to connect with: `flag`, then `env`, then the file.
    pub fn resolve_dsn(&self, flag: Option<&str>, env: Option<String>) -> Result<String> {
        flag.map(str::to_string)
            .or(env)
            .or_else(|| self.connection.as_ref().and_then(|c| c.dsn.clone()))
            .filter(|dsn| !dsn.trim().is_empty())
            .ok_or_else(|| {
                SchemaAdminError::Config(format!(
                    "no DSN configured; pass --dsn, set {} or add [connection] dsn to the config file",
                    DSN_ENV
                ))
            })
    }

    pub fn strict_identifiers(&self) -> bool {
        self.identifiers
            .as_ref()
            .and_then(|i| i.strict)
            .unwrap_or(false)
    }

    pub fn log_filter(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// `<config dir>/schema-admin/config.toml`, when a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("schema-admin").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        SchemaAdminError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    Config::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CONFIG: &str = r#"
[connection]
dsn = "app:secret@tcp(127.0.0.1:3306)/app"

[identifiers]
strict = true

[logging]
filter = "schema_admin=debug"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = Config::from_toml(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(
            config.connection.as_ref().unwrap().dsn.as_deref(),
            Some("app:secret@tcp(127.0.0.1:3306)/app")
        );
        assert!(config.strict_identifiers());
        assert_eq!(config.log_filter(), "schema_admin=debug");
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(!config.strict_identifiers());
        assert_eq!(config.log_filter(), "warn");
        assert!(config.resolve_dsn(None, None).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Config::from_toml("[connection]\nhost = \"db\"\n").unwrap_err();
        assert!(matches!(err, SchemaAdminError::Config(_)));
    }

    #[test]
    fn test_dsn_precedence() {
        let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
        assert_eq!(
            config.resolve_dsn(Some("flag@/a"), Some("env@/b".to_string())).unwrap(),
            "flag@/a"
        );
        assert_eq!(
            config.resolve_dsn(None, Some("env@/b".to_string())).unwrap(),
            "env@/b"
        );
        assert_eq!(
            config.resolve_dsn(None, None).unwrap(),
            "app:secret@tcp(127.0.0.1:3306)/app"
        );
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();

        let config = Config::discover(Some(file.path())).unwrap();
        assert!(config.strict_identifiers());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
