/// # Test Utilities Module
///
/// An in-memory stand-in for a MySQL server, so the schema handle and the
/// command-line front end can be exercised without a live database.
///
/// `MemoryServer` holds the catalogue, a statement log and fault injection
/// switches. Every `MemoryBackend` obtained from `MemoryServer::connect`
/// shares that state, the way two connections share one server.
///
/// The backend understands exactly the statements the schema handle sends:
/// `SHOW TABLES`, `DESC`, `SHOW CREATE TABLE`, `DROP TABLE IF EXISTS`,
/// `ALTER TABLE .. AUTO_INCREMENT = n` and `CREATE TABLE`. Anything else is
/// answered with a MySQL-style syntax error.

use crate::core::db::connection::{Backend, TextResultSet};
use crate::core::db::identifier::{object_name_text, parse_create_table};
use crate::core::{Result, SchemaAdminError};
use sqlparser::ast::{ColumnDef, ColumnOption, DataType, Statement, TableConstraint};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A table held by the in-memory server
#[derive(Debug, Clone)]
pub struct MemoryTable {
    /// DDL as reported by `SHOW CREATE TABLE`
    pub ddl: String,
    /// `DESC` rows: Field, Type, Null, Key, Default, Extra
    pub columns: Vec<[String; 6]>,
    pub auto_increment: u64,
}

const DESC_FIELDS: [&str; 6] = ["Field", "Type", "Null", "Key", "Default", "Extra"];

#[derive(Debug, Default)]
struct ServerState {
    database: String,
    // MySQL lists tables in name order.
    tables: BTreeMap<String, MemoryTable>,
    statements: Vec<String>,
    responses: HashMap<String, TextResultSet>,
    ping_failure: Option<String>,
    query_failure: Option<String>,
    statement_failures: Vec<(String, String)>,
    pings: usize,
    open_connections: usize,
}

/// Shared in-memory server state
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    /// Creates an empty server whose selected database is `database`.
    pub fn new(database: &str) -> Self {
        let server = MemoryServer::default();
        server.lock().database = database.to_string();
        server
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        // A panicking test must not poison the state for later assertions.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a new connection to this server.
    pub fn connect(&self) -> MemoryBackend {
        self.lock().open_connections += 1;
        MemoryBackend {
            server: self.clone(),
            closed: false,
        }
    }

    /// Every query and statement received so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    /// Number of pings received
    pub fn pings(&self) -> usize {
        self.lock().pings
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }

    /// Names of the tables currently held
    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    /// Current auto-increment counter of `table`
    pub fn auto_increment(&self, table: &str) -> Option<u64> {
        self.lock().tables.get(table).map(|t| t.auto_increment)
    }

    /// Makes every following ping fail with `message`.
    pub fn fail_ping(&self, message: &str) {
        self.lock().ping_failure = Some(message.to_string());
    }

    /// Makes every following query fail with `message`.
    pub fn fail_queries(&self, message: &str) {
        self.lock().query_failure = Some(message.to_string());
    }

    /// Makes statements starting with `prefix` fail with `message`.
    pub fn fail_statements_starting_with(&self, prefix: &str, message: &str) {
        self.lock()
            .statement_failures
            .push((prefix.to_string(), message.to_string()));
    }

    /// Answers `sql` with a canned result instead of the catalogue.
    pub fn respond(&self, sql: &str, result: TextResultSet) {
        self.lock().responses.insert(sql.to_string(), result);
    }
}

/// One connection to a `MemoryServer`
#[derive(Debug)]
pub struct MemoryBackend {
    server: MemoryServer,
    closed: bool,
}

impl MemoryBackend {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self, into_error: fn(String) -> SchemaAdminError) -> Result<()> {
        if self.closed {
            Err(into_error("connection is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Backend for MemoryBackend {
    fn ping(&mut self) -> Result<()> {
        self.ensure_open(SchemaAdminError::Connection)?;
        let mut state = self.server.lock();
        state.pings += 1;
        match &state.ping_failure {
            Some(message) => Err(SchemaAdminError::Connection(message.clone())),
            None => Ok(()),
        }
    }

    fn query(&mut self, sql: &str) -> Result<TextResultSet> {
        self.ensure_open(SchemaAdminError::Query)?;
        let mut state = self.server.lock();
        state.statements.push(sql.to_string());

        if let Some(message) = &state.query_failure {
            return Err(SchemaAdminError::Query(message.clone()));
        }
        if let Some(result) = state.responses.get(sql) {
            return Ok(result.clone());
        }
        state.answer_query(sql).map_err(SchemaAdminError::Query)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.ensure_open(SchemaAdminError::Statement)?;
        let mut state = self.server.lock();
        state.statements.push(sql.to_string());

        if let Some((_, message)) = state
            .statement_failures
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
        {
            return Err(SchemaAdminError::Statement(message.clone()));
        }
        state.run_statement(sql).map_err(SchemaAdminError::Statement)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.server.lock().open_connections -= 1;
        }
        Ok(())
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Strips trailing whitespace and semicolons.
fn statement_body(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Case-insensitive prefix match returning the remainder.
fn strip_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let head = sql.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(sql[keyword.len()..].trim())
    } else {
        None
    }
}

fn syntax_error(sql: &str) -> String {
    format!(
        "ERROR 1064 (42000): You have an error in your SQL syntax near '{}'",
        sql
    )
}

impl ServerState {
    fn missing_table(&self, table: &str) -> String {
        format!(
            "ERROR 1146 (42S02): Table '{}.{}' doesn't exist",
            self.database, table
        )
    }

    fn table(&self, name: &str) -> std::result::Result<&MemoryTable, String> {
        self.tables.get(name).ok_or_else(|| self.missing_table(name))
    }

    fn answer_query(&self, sql: &str) -> std::result::Result<TextResultSet, String> {
        let body = statement_body(sql);

        if body.eq_ignore_ascii_case("SHOW TABLES") {
            return Ok(TextResultSet::new(
                vec![format!("Tables_in_{}", self.database)],
                self.tables.keys().map(|name| vec![name.clone()]).collect(),
            ));
        }
        if let Some(name) = strip_keyword(body, "SHOW CREATE TABLE ") {
            let table = self.table(name)?;
            return Ok(TextResultSet::new(
                vec!["Table".to_string(), "Create Table".to_string()],
                vec![vec![name.to_string(), table.ddl.clone()]],
            ));
        }
        if let Some(name) =
            strip_keyword(body, "DESCRIBE ").or_else(|| strip_keyword(body, "DESC "))
        {
            let table = self.table(name)?;
            return Ok(TextResultSet::new(
                DESC_FIELDS.iter().map(|f| f.to_string()).collect(),
                table.columns.iter().map(|row| row.to_vec()).collect(),
            ));
        }
        Err(syntax_error(sql))
    }

    fn run_statement(&mut self, sql: &str) -> std::result::Result<(), String> {
        let body = statement_body(sql);

        if let Some(name) = strip_keyword(body, "DROP TABLE IF EXISTS ") {
            self.tables.remove(name);
            return Ok(());
        }
        if let Some(rest) = strip_keyword(body, "ALTER TABLE ") {
            let (name, clause) = rest.split_once(' ').ok_or_else(|| syntax_error(sql))?;
            let value = strip_keyword(clause.trim(), "AUTO_INCREMENT")
                .and_then(|v| v.trim_start_matches('=').trim().parse::<u64>().ok())
                .ok_or_else(|| syntax_error(sql))?;
            let missing = self.missing_table(name);
            let table = self.tables.get_mut(name).ok_or(missing)?;
            // MySQL never moves the counter below max(id) + 1.
            table.auto_increment = value.max(1);
            return Ok(());
        }
        if strip_keyword(body, "CREATE ").is_some() {
            return self.create(body);
        }
        Err(syntax_error(sql))
    }

    fn create(&mut self, ddl: &str) -> std::result::Result<(), String> {
        let statement = parse_create_table(ddl)
            .map_err(|e| format!("ERROR 1064 (42000): {}", e))?;
        // Reported back as written, the way MySQL keeps the caller's type names.
        let ddl = ddl.to_string();

        if let Statement::CreateTable {
            name,
            columns,
            constraints,
            if_not_exists,
            ..
        } = statement
        {
            let name = object_name_text(&name);
            if self.tables.contains_key(&name) {
                if if_not_exists {
                    return Ok(());
                }
                return Err(format!("ERROR 1050 (42S01): Table '{}' already exists", name));
            }
            if columns.is_empty() {
                return Err("ERROR 1113 (42000): A table must have at least 1 column".to_string());
            }

            let mut primary: Vec<String> = Vec::new();
            let mut unique: Vec<String> = Vec::new();
            for constraint in &constraints {
                if let TableConstraint::Unique {
                    columns, is_primary, ..
                } = constraint
                {
                    let target = if *is_primary { &mut primary } else { &mut unique };
                    target.extend(columns.iter().map(|c| c.value.clone()));
                }
            }

            let rows = columns
                .iter()
                .map(|column| describe_column(column, &primary, &unique))
                .collect();
            self.tables.insert(
                name,
                MemoryTable {
                    ddl,
                    columns: rows,
                    auto_increment: 1,
                },
            );
        }
        Ok(())
    }
}

/// Builds the `DESC` row MySQL would report for a column definition.
fn describe_column(column: &ColumnDef, primary: &[String], unique: &[String]) -> [String; 6] {
    let name = column.name.value.clone();
    let mut not_null = false;
    let mut key = "";
    let mut default = String::new();

    if primary.contains(&name) {
        key = "PRI";
    } else if unique.contains(&name) {
        key = "UNI";
    }
    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull => not_null = true,
            ColumnOption::Default(expr) => default = expr.to_string(),
            ColumnOption::Unique { is_primary, .. } => {
                key = if *is_primary { "PRI" } else if key.is_empty() { "UNI" } else { key };
            }
            _ => {}
        }
    }
    // Primary key columns are implicitly NOT NULL.
    if key == "PRI" {
        not_null = true;
    }
    let extra = if column.to_string().to_uppercase().contains("AUTO_INCREMENT") {
        "auto_increment"
    } else {
        ""
    };

    [
        name,
        mysql_type_name(&column.data_type),
        if not_null { "NO" } else { "YES" }.to_string(),
        key.to_string(),
        default,
        extra.to_string(),
    ]
}

/// The `Type` column MySQL 8 reports for a declared data type.
fn mysql_type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Char(length) => format!("char({})", length.unwrap_or(1)),
        DataType::Varchar(Some(length)) => format!("varchar({})", length),
        DataType::Varchar(None) => "varchar".to_string(),
        DataType::Binary(length) => format!("binary({})", length),
        DataType::Varbinary(length) => format!("varbinary({})", length),
        DataType::Decimal(precision, scale) => format!(
            "decimal({},{})",
            precision.unwrap_or(10),
            scale.unwrap_or(0)
        ),
        // Integer display widths are deprecated and not reported.
        DataType::TinyInt(_) => "tinyint".to_string(),
        DataType::UnsignedTinyInt(_) => "tinyint unsigned".to_string(),
        DataType::SmallInt(_) => "smallint".to_string(),
        DataType::UnsignedSmallInt(_) => "smallint unsigned".to_string(),
        DataType::Int(_) => "int".to_string(),
        DataType::UnsignedInt(_) => "int unsigned".to_string(),
        DataType::BigInt(_) => "bigint".to_string(),
        DataType::UnsignedBigInt(_) => "bigint unsigned".to_string(),
        DataType::Boolean => "tinyint(1)".to_string(),
        DataType::Float(_) => "float".to_string(),
        DataType::Real | DataType::Double => "double".to_string(),
        DataType::Blob(_) => "blob".to_string(),
        DataType::Enum(values) | DataType::Set(values) => {
            let kind = if matches!(data_type, DataType::Enum(_)) { "enum" } else { "set" };
            let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
            format!("{}({})", kind, quoted.join(","))
        }
        other => other.to_string().to_lowercase(),
    }
}
