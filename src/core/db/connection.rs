/// Connection Module
///
/// This module defines the `Backend` seam the schema handle talks through,
/// and the MySQL implementation of it.
///
/// `mysql_async` needs a Tokio runtime, so every `MySqlConnection` owns a
/// current-thread runtime and blocks on it. The public API stays synchronous;
/// it must not be called from inside another Tokio runtime.

use crate::core::db::dsn::Dsn;
use crate::core::{Result, SchemaAdminError};
use mysql_async::prelude::*;
use mysql_async::{Conn, Row, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

/// A fully read result set with every value rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextResultSet {
    /// Column names as reported by the server, in order
    pub columns: Vec<String>,
    /// Rows of values, each the same length as `columns`
    pub rows: Vec<Vec<String>>,
}

impl TextResultSet {
    /// Creates a result set from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        TextResultSet { columns, rows }
    }

    /// Number of rows in the result set
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A single live connection that can run text queries and statements.
///
/// Implementations must have fully released the server-side result set by
/// the time `query` returns, on success and on error.
pub trait Backend {
    /// Liveness check. Failures are `SchemaAdminError::Connection`.
    fn ping(&mut self) -> Result<()>;

    /// Runs a query and reads every row. Failures are `SchemaAdminError::Query`.
    fn query(&mut self, sql: &str) -> Result<TextResultSet>;

    /// Runs a statement and discards any result. Failures are
    /// `SchemaAdminError::Statement`.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Releases the connection. Further calls fail.
    fn close(&mut self) -> Result<()>;
}

const CLOSED: &str = "connection is closed";

/// A MySQL connection driven from a dedicated Tokio runtime.
pub struct MySqlConnection {
    runtime: Runtime,
    conn: Option<Conn>,
    description: String,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("dsn", &self.description)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl MySqlConnection {
    /// Opens a connection described by `dsn`.
    ///
    /// No ping is issued here; `SchemaAdmin::with_backend` does that.
    pub fn open(dsn: &Dsn) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SchemaAdminError::Connection(e.to_string()))?;

        let description = dsn.redacted();
        info!(dsn = %description, "connecting to MySQL");

        let opts = dsn.to_opts()?;
        let conn = runtime
            .block_on(Conn::new(opts))
            .map_err(|e| SchemaAdminError::Connection(e.to_string()))?;

        Ok(MySqlConnection {
            runtime,
            conn: Some(conn),
            description,
        })
    }

    /// Redacted description of the DSN this connection was opened with
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true until `close` has been called.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

impl Backend for MySqlConnection {
    fn ping(&mut self) -> Result<()> {
        let MySqlConnection { runtime, conn, .. } = self;
        let conn = conn
            .as_mut()
            .ok_or_else(|| SchemaAdminError::Connection(CLOSED.to_string()))?;

        runtime
            .block_on(conn.ping())
            .map_err(|e| SchemaAdminError::Connection(e.to_string()))
    }

    fn query(&mut self, sql: &str) -> Result<TextResultSet> {
        let MySqlConnection { runtime, conn, .. } = self;
        let conn = conn
            .as_mut()
            .ok_or_else(|| SchemaAdminError::Query(CLOSED.to_string()))?;

        debug!(sql, "running query");
        let result = runtime
            .block_on(async move {
                let result = conn.query_iter(sql).await?;
                let columns: Vec<String> = result
                    .columns_ref()
                    .iter()
                    .map(|column| column.name_str().into_owned())
                    .collect();
                // Drains this and any trailing result sets before returning.
                let rows: Vec<Row> = result.collect_and_drop().await?;
                Ok::<_, mysql_async::Error>(TextResultSet {
                    columns,
                    rows: rows.into_iter().map(row_to_text).collect(),
                })
            })
            .map_err(|e| SchemaAdminError::Query(e.to_string()))?;

        debug!(rows = result.row_count(), "query finished");
        Ok(result)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        let MySqlConnection { runtime, conn, .. } = self;
        let conn = conn
            .as_mut()
            .ok_or_else(|| SchemaAdminError::Statement(CLOSED.to_string()))?;

        debug!(sql, "executing statement");
        runtime
            .block_on(conn.query_drop(sql))
            .map_err(|e| SchemaAdminError::Statement(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                info!(dsn = %self.description, "closing MySQL connection");
                self.runtime
                    .block_on(conn.disconnect())
                    .map_err(|e| SchemaAdminError::Connection(e.to_string()))
            }
            None => Ok(()),
        }
    }
}

impl Drop for MySqlConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close MySQL connection on drop");
        }
    }
}

fn row_to_text(row: Row) -> Vec<String> {
    row.unwrap().into_iter().map(value_to_text).collect()
}

/// Renders a driver value as text without type-specific decoding.
///
/// The text protocol delivers every non-NULL cell as raw bytes, which are
/// converted lossily to UTF-8. NULL becomes the empty string. The remaining
/// variants only appear on the binary protocol and are formatted the way the
/// server would print them.
pub fn value_to_text(value: Value) -> String {
    match value {
        Value::NULL => String::new(),
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        },
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            );
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            text
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, minutes, seconds);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            text
        }
    }
}
