/// Identifier Policy Module
///
/// Table names and caller DDL are spliced into statement text as-is. The
/// default `Trusted` policy keeps it that way. `Strict` rejects anything that
/// is not a plain identifier, and DDL that is not a single `CREATE TABLE` for
/// the named table, before a statement reaches the server.

use crate::core::{Result, SchemaAdminError};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{ObjectName, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Longest identifier MySQL accepts for a table or schema name.
pub const MAX_IDENTIFIER_LEN: usize = 64;

static PLAIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid"));

/// How table names and DDL are vetted before interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Interpolate verbatim. The caller is trusted to pass safe identifiers.
    #[default]
    Trusted,
    /// Accept only `name` or `schema.name` built from plain identifiers.
    Strict,
}

impl IdentifierPolicy {
    /// Checks a table name.
    pub fn check_table(&self, name: &str) -> Result<()> {
        match self {
            IdentifierPolicy::Trusted => Ok(()),
            IdentifierPolicy::Strict => validate_table_name(name),
        }
    }

    /// Checks a table name and the DDL meant to create it.
    pub fn check_create(&self, table: &str, ddl: &str) -> Result<()> {
        if *self == IdentifierPolicy::Trusted {
            return Ok(());
        }
        validate_table_name(table)?;

        let statement = parse_create_table(ddl).map_err(SchemaAdminError::Statement)?;
        if let Statement::CreateTable { name, .. } = &statement {
            let created = object_name_text(name);
            if created != table {
                return Err(SchemaAdminError::Statement(format!(
                    "DDL creates table {:?}, expected {:?}",
                    created, table
                )));
            }
        }
        Ok(())
    }
}

/// Validates `name` or `schema.name` made of plain identifiers.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut parts = name.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, None) => is_plain_identifier(table),
        (Some(schema), Some(table), None) => {
            is_plain_identifier(schema) && is_plain_identifier(table)
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SchemaAdminError::InvalidIdentifier(format!(
            "{:?} is not a plain table name",
            name
        )))
    }
}

/// True for identifiers that need no quoting.
pub fn is_plain_identifier(part: &str) -> bool {
    part.len() <= MAX_IDENTIFIER_LEN && PLAIN_IDENTIFIER.is_match(part)
}

/// Parses `ddl` as exactly one `CREATE TABLE` statement.
pub(crate) fn parse_create_table(ddl: &str) -> std::result::Result<Statement, String> {
    let mut statements = Parser::parse_sql(&MySqlDialect {}, ddl).map_err(|e| e.to_string())?;
    if statements.len() != 1 {
        return Err(format!(
            "expected a single CREATE TABLE statement, found {} statements",
            statements.len()
        ));
    }

    match statements.remove(0) {
        statement @ Statement::CreateTable { .. } => Ok(statement),
        other => Err(format!("expected CREATE TABLE, found: {}", other)),
    }
}

/// `schema.table` with quoting removed.
pub(crate) fn object_name_text(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}
