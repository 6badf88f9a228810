/// Schema Administration Module
///
/// `SchemaAdmin` owns one connection and exposes table-level introspection
/// and management. Every operation is a single blocking round trip built
/// from a fixed statement template:
///
/// | operation          | statement                                  |
/// |--------------------|--------------------------------------------|
/// | `list_tables`      | `SHOW TABLES;`                             |
/// | `describe_table`   | `DESC <table>;`                            |
/// | `create_statement` | `SHOW CREATE TABLE <table>;`               |
/// | `drop_table`       | `DROP TABLE IF EXISTS <table>`             |
/// | `create_table`     | `<ddl>;` then `ALTER TABLE <table> AUTO_INCREMENT = 0;` |
///
/// The handle is single-owner: every operation takes `&mut self`. Callers
/// that share one across threads must put it behind a `Mutex`.

use crate::core::db::connection::{Backend, MySqlConnection, TextResultSet};
use crate::core::db::dsn::Dsn;
use crate::core::db::identifier::IdentifierPolicy;
use crate::core::{Result, SchemaAdminError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One row of `DESC <table>`: metadata field name to text value, in the
/// order the server reported the fields (`Field`, `Type`, `Null`, `Key`,
/// `Default`, `Extra` on MySQL).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDescription {
    fields: Vec<(String, String)>,
}

impl ColumnDescription {
    /// Pairs column names with one row's values.
    pub fn from_row(columns: &[String], row: Vec<String>) -> Self {
        ColumnDescription {
            fields: columns.iter().cloned().zip(row).collect(),
        }
    }

    /// Value of a metadata field, matched exactly.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// The described column's name (`Field`)
    pub fn name(&self) -> Option<&str> {
        self.get("Field")
    }

    /// The described column's type (`Type`), e.g. `varchar(50)`
    pub fn column_type(&self) -> Option<&str> {
        self.get("Type")
    }

    /// Whether `Null` is reported as `YES`
    pub fn is_nullable(&self) -> bool {
        self.get("Null") == Some("YES")
    }

    /// Field names in server order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// `(field, value)` pairs in server order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drops the field order.
    pub fn into_map(self) -> HashMap<String, String> {
        self.fields.into_iter().collect()
    }
}

impl Serialize for ColumnDescription {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A handle owning one database connection.
#[derive(Debug)]
pub struct SchemaAdmin<B: Backend = MySqlConnection> {
    backend: B,
    policy: IdentifierPolicy,
}

impl SchemaAdmin<MySqlConnection> {
    /// Connects to MySQL using a `mysql://` URL or a driver-style DSN and
    /// pings the server. No retry is attempted.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use schema_admin::core::db::SchemaAdmin;
    ///
    /// let mut admin = SchemaAdmin::connect("app:secret@tcp(127.0.0.1:3306)/app")?;
    /// for table in admin.list_tables()? {
    ///     println!("{}", table);
    /// }
    /// admin.close();
    /// # Ok::<(), schema_admin::core::SchemaAdminError>(())
    /// ```
    pub fn connect(dsn: &str) -> Result<Self> {
        let dsn = Dsn::parse(dsn)?;
        let connection = MySqlConnection::open(&dsn)?;
        SchemaAdmin::with_backend(connection)
    }
}

impl<B: Backend> SchemaAdmin<B> {
    /// Wraps an already open backend, pinging it first.
    pub fn with_backend(mut backend: B) -> Result<Self> {
        backend.ping()?;
        info!("connection ready");
        Ok(SchemaAdmin {
            backend,
            policy: IdentifierPolicy::default(),
        })
    }

    /// Sets how table names and DDL are vetted.
    pub fn with_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> IdentifierPolicy {
        self.policy
    }

    /// The underlying connection
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Table names in the selected database, in server order.
    pub fn list_tables(&mut self) -> Result<Vec<String>> {
        let result = self.backend.query("SHOW TABLES;")?;
        let tables: Vec<String> = result
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect();
        debug!(count = tables.len(), "listed tables");
        Ok(tables)
    }

    /// One description per column of `table`, in column order.
    pub fn describe_table(&mut self, table: &str) -> Result<Vec<ColumnDescription>> {
        self.policy.check_table(table)?;
        let TextResultSet { columns, rows } = self.backend.query(&format!("DESC {};", table))?;
        Ok(rows
            .into_iter()
            .map(|row| ColumnDescription::from_row(&columns, row))
            .collect())
    }

    /// Whether `table` appears in `list_tables`, compared exactly.
    pub fn table_exists(&mut self, table: &str) -> Result<bool> {
        let tables = self.list_tables()?;
        Ok(tables.iter().any(|t| t == table))
    }

    /// The `CREATE TABLE` statement the server reports for `table`.
    pub fn create_statement(&mut self, table: &str) -> Result<String> {
        self.policy.check_table(table)?;
        let result = self
            .backend
            .query(&format!("SHOW CREATE TABLE {};", table))?;

        let row = result.rows.into_iter().next().ok_or_else(|| {
            SchemaAdminError::Query(format!("SHOW CREATE TABLE {} returned no rows", table))
        })?;
        if row.len() != 2 {
            return Err(SchemaAdminError::Query(format!(
                "SHOW CREATE TABLE {} returned {} columns, expected 2",
                table,
                row.len()
            )));
        }
        Ok(row.into_iter().nth(1).unwrap_or_default())
    }

    /// Drops `table` if it exists. A missing table is not an error.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        self.policy.check_table(table)?;
        self.backend
            .execute(&format!("DROP TABLE IF EXISTS {}", table))?;
        info!(table, "dropped table");
        Ok(())
    }

    /// Runs `ddl`, then resets the table's auto-increment counter.
    ///
    /// The two statements are not atomic: when the reset fails the table
    /// has been created but an error is still returned.
    pub fn create_table(&mut self, table: &str, ddl: &str) -> Result<()> {
        self.policy.check_create(table, ddl)?;

        let ddl = ddl.trim_end().trim_end_matches(';');
        self.backend.execute(&format!("{};", ddl))?;
        info!(table, "created table");

        if let Err(e) = self
            .backend
            .execute(&format!("ALTER TABLE {} AUTO_INCREMENT = 0;", table))
        {
            warn!(table, error = %e, "table created but auto-increment reset failed");
            return Err(e);
        }
        Ok(())
    }

    /// Releases the connection. Failures are logged and otherwise ignored.
    pub fn close(mut self) {
        if let Err(e) = self.backend.close() {
            warn!(error = %e, "error while closing connection");
        }
    }
}
