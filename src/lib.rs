// Core infrastructure modules
pub mod core;

// Front-end modules
pub mod cli;
pub mod config;

// In-memory server used by the crate's own tests and by downstream tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::core::db::{ColumnDescription, IdentifierPolicy, SchemaAdmin};
pub use crate::core::{Result, SchemaAdminError};
