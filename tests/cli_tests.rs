//! Tests for the `schema-admin` binary that need no database server.

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// A command isolated from the caller's environment and config dir.
    fn schema_admin(config: &NamedTempFile) -> Command {
        let mut cmd = Command::cargo_bin("schema-admin").unwrap();
        cmd.env_remove("SCHEMA_ADMIN_DSN")
            .env_remove("RUST_LOG")
            .env("SCHEMA_ADMIN_CONFIG", config.path());
        cmd
    }

    fn empty_config() -> NamedTempFile {
        NamedTempFile::new().unwrap()
    }

    #[test]
    fn test_help_lists_commands() {
        let output = schema_admin(&empty_config()).arg("--help").output().unwrap();
        assert!(output.status.success());
        let help = String::from_utf8_lossy(&output.stdout);
        for command in ["tables", "describe", "exists", "show-create", "drop", "create"] {
            assert!(help.contains(command), "help should mention {}", command);
        }
    }

    #[test]
    fn test_missing_dsn_is_reported() {
        let output = schema_admin(&empty_config()).arg("tables").output().unwrap();
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Configuration error"), "{}", stderr);
        assert!(stderr.contains("SCHEMA_ADMIN_DSN"), "{}", stderr);
    }

    #[test]
    fn test_malformed_dsn_is_a_connection_error() {
        let output = schema_admin(&empty_config())
            .args(["--dsn", "not a dsn", "tables"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Connection error: invalid DSN"), "{}", stderr);
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn test_dsn_from_environment_is_used() {
        let output = schema_admin(&empty_config())
            .env("SCHEMA_ADMIN_DSN", "postgres://localhost/app")
            .arg("tables")
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("mysql://"), "{}", stderr);
    }

    #[test]
    fn test_invalid_config_file() {
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "[connection]\nport = 3306").unwrap();

        let output = schema_admin(&config).arg("tables").output().unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration error"));
    }

    #[test]
    fn test_create_requires_ddl() {
        let output = schema_admin(&empty_config())
            .args(["create", "users"])
            .output()
            .unwrap();
        assert!(!output.status.success());
    }
}
