/// Database Module
///
/// ## Architecture
///
/// - **Connection** (`connection.rs`): the `Backend` trait and the MySQL
///   implementation that drives `mysql_async` from a blocking API
/// - **DSN parsing** (`dsn.rs`): `mysql://` URLs and driver-style DSNs
/// - **Identifier policy** (`identifier.rs`): optional checks on the table
///   names and DDL spliced into statements
/// - **Schema administration** (`schema.rs`): the `SchemaAdmin` handle
///
/// ## Error Handling
///
/// All operations return `SchemaAdminError`, split into connection, query
/// and statement failures.
pub mod connection;
pub mod dsn;
pub mod identifier;
pub mod schema;

pub use connection::*;
pub use dsn::*;
pub use identifier::*;
pub use schema::*;
