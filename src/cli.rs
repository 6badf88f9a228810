//! Command-line front end: argument definitions and command execution.

use crate::core::db::{Backend, ColumnDescription, SchemaAdmin};
use crate::config::CONFIG_ENV;
use crate::core::{Result, SchemaAdminError};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "schema-admin", version)]
#[command(about = "List, describe, create and drop MySQL tables", long_about = None)]
pub struct Cli {
    /// Connection string (mysql:// URL or user:pass@tcp(host:port)/db)
    #[arg(long, global = true)]
    pub dsn: Option<String>,

    /// Configuration file (defaults to <config dir>/schema-admin/config.toml)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Reject table names that are not plain identifiers
    #[arg(long, global = true)]
    pub strict: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "List tables in the selected database")]
    Tables,

    #[command(about = "Show column metadata of a table")]
    Describe { table: String },

    #[command(about = "Check whether a table exists (exit code 1 when absent)")]
    Exists { table: String },

    #[command(about = "Print the CREATE TABLE statement of a table")]
    ShowCreate { table: String },

    #[command(about = "Drop a table if it exists")]
    Drop { table: String },

    #[command(about = "Create a table and reset its auto-increment counter")]
    Create {
        table: String,

        /// CREATE TABLE statement
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        ddl: Option<String>,

        /// Read the CREATE TABLE statement from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// How a successful command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// `exists` found no such table
    Absent,
}

/// Runs one command against an open handle, writing results to `out`.
pub fn execute<B: Backend, W: Write>(
    admin: &mut SchemaAdmin<B>,
    command: &Command,
    as_json: bool,
    out: &mut W,
) -> Result<Outcome> {
    match command {
        Command::Tables => {
            let tables = admin.list_tables()?;
            if as_json {
                serde_json::to_writer(&mut *out, &tables)?;
                writeln!(out)?;
            } else {
                for table in &tables {
                    writeln!(out, "{}", table)?;
                }
            }
        }
        Command::Describe { table } => {
            let columns = admin.describe_table(table)?;
            if as_json {
                serde_json::to_writer(&mut *out, &columns)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", render_description(&columns))?;
            }
        }
        Command::Exists { table } => {
            let exists = admin.table_exists(table)?;
            if as_json {
                writeln!(out, "{}", json!({ "table": table, "exists": exists }))?;
            } else {
                writeln!(out, "{}", exists)?;
            }
            if !exists {
                return Ok(Outcome::Absent);
            }
        }
        Command::ShowCreate { table } => {
            let ddl = admin.create_statement(table)?;
            if as_json {
                writeln!(out, "{}", json!({ "table": table, "create_table": ddl }))?;
            } else {
                writeln!(out, "{}", ddl)?;
            }
        }
        Command::Drop { table } => {
            admin.drop_table(table)?;
            if as_json {
                writeln!(out, "{}", json!({ "table": table, "dropped": true }))?;
            }
        }
        Command::Create { table, ddl, file } => {
            let ddl = match (ddl, file) {
                (Some(ddl), _) => ddl.clone(),
                (None, Some(path)) => fs::read_to_string(path)?,
                (None, None) => {
                    return Err(SchemaAdminError::Statement(
                        "no CREATE TABLE statement given".to_string(),
                    ))
                }
            };
            admin.create_table(table, &ddl)?;
            if as_json {
                writeln!(out, "{}", json!({ "table": table, "created": true }))?;
            }
        }
    }
    Ok(Outcome::Success)
}

/// Renders `DESC` rows as a tab-separated table with a header line.
pub fn render_description(columns: &[ColumnDescription]) -> String {
    let mut text = String::new();
    if let Some(first) = columns.first() {
        text.push_str(&first.field_names().collect::<Vec<_>>().join("\t"));
        text.push('\n');
    }
    for column in columns {
        let values: Vec<&str> = column.iter().map(|(_, value)| value).collect();
        text.push_str(&values.join("\t"));
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryBackend, MemoryServer};

    const USERS_DDL: &str = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))";

    fn run(admin: &mut SchemaAdmin<MemoryBackend>, command: Command, as_json: bool) -> (Outcome, String) {
        let mut out = Vec::new();
        let outcome = execute(admin, &command, as_json, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    fn users_admin() -> SchemaAdmin<MemoryBackend> {
        let server = MemoryServer::new("app");
        let mut admin = SchemaAdmin::with_backend(server.connect()).unwrap();
        admin.create_table("users", USERS_DDL).unwrap();
        admin
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["schema-admin", "--dsn", "app@/app", "describe", "users", "--json"])
            .unwrap();
        assert_eq!(cli.dsn.as_deref(), Some("app@/app"));
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Describe { ref table } if table == "users"));

        assert!(Cli::try_parse_from(["schema-admin", "create", "users"]).is_err());
        assert!(Cli::try_parse_from(["schema-admin", "create", "users", "DDL", "--file", "x.sql"]).is_err());
    }

    #[test]
    fn test_tables_text_and_json() {
        let mut admin = users_admin();
        let (_, text) = run(&mut admin, Command::Tables, false);
        insta::assert_snapshot!(text.trim_end(), @"users");

        let (_, json) = run(&mut admin, Command::Tables, true);
        insta::assert_snapshot!(json.trim_end(), @r#"["users"]"#);
    }

    #[test]
    fn test_describe_text() {
        let mut admin = users_admin();
        let (_, text) = run(&mut admin, Command::Describe { table: "users".to_string() }, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Field\tType\tNull\tKey\tDefault\tExtra");
        assert_eq!(lines[1], "id\tint\tNO\tPRI\t\t");
        assert_eq!(lines[2], "name\tvarchar(50)\tYES\t\t\t");
    }

    #[test]
    fn test_describe_json_keeps_field_order() {
        let mut admin = users_admin();
        let (_, json) = run(&mut admin, Command::Describe { table: "users".to_string() }, true);
        assert!(json.starts_with(r#"[{"Field":"id","Type":"int","#));
    }

    #[test]
    fn test_exists_outcome() {
        let mut admin = users_admin();
        let (outcome, text) = run(&mut admin, Command::Exists { table: "users".to_string() }, false);
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(text, "true\n");

        let (outcome, json) = run(&mut admin, Command::Exists { table: "orders".to_string() }, true);
        assert_eq!(outcome, Outcome::Absent);
        insta::assert_snapshot!(json.trim_end(), @r#"{"exists":false,"table":"orders"}"#);
    }

    #[test]
    fn test_drop_and_create_from_file() {
        let mut admin = users_admin();
        run(&mut admin, Command::Drop { table: "users".to_string() }, false);
        assert!(!admin.table_exists("users").unwrap());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.sql");
        fs::write(&path, format!("{};\n", USERS_DDL)).unwrap();
        run(
            &mut admin,
            Command::Create {
                table: "users".to_string(),
                ddl: None,
                file: Some(path),
            },
            false,
        );
        assert!(admin.table_exists("users").unwrap());
    }

    #[test]
    fn test_errors_propagate() {
        let mut admin = users_admin();
        let mut out = Vec::new();
        let err = execute(
            &mut admin,
            &Command::ShowCreate { table: "missing_table".to_string() },
            false,
            &mut out,
        )
        .unwrap_err();
        assert!(err.is_query());
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_empty_description() {
        assert_eq!(render_description(&[]), "");
    }
}
