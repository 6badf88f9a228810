/// Schema Admin Error Module
///
/// This module defines the error type shared by every layer of the crate.
/// Database failures are split by the kind of call that produced them so
/// callers can tell a failed connect from a failed read or write.
use thiserror::Error;

/// Error type for schema administration.
///
/// The three database variants carry the driver's message verbatim:
/// - `Connection` for anything that fails while opening or pinging
/// - `Query` for read operations (`SHOW TABLES`, `DESC`, `SHOW CREATE TABLE`)
/// - `Statement` for write operations (`CREATE`, `ALTER`, `DROP`)
#[derive(Error, Debug)]
pub enum SchemaAdminError {
    /// Malformed DSN, unreachable server, failed authentication or ping
    #[error("Connection error: {0}")]
    Connection(String),

    /// A read query failed or returned an unexpected shape
    #[error("Query error: {0}")]
    Query(String),

    /// A DDL statement failed
    #[error("Statement error: {0}")]
    Statement(String),

    /// A table name rejected by the strict identifier policy
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaAdminError {
    /// Returns true for failures raised while establishing the connection.
    pub fn is_connection(&self) -> bool {
        matches!(self, SchemaAdminError::Connection(_))
    }

    /// Returns true for failures of read operations.
    pub fn is_query(&self) -> bool {
        matches!(self, SchemaAdminError::Query(_))
    }

    /// Returns true for failures of write operations.
    pub fn is_statement(&self) -> bool {
        matches!(self, SchemaAdminError::Statement(_))
    }
}

/// Type alias for Result to use SchemaAdminError as the error type.
pub type Result<T> = std::result::Result<T, SchemaAdminError>;
