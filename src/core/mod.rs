/// Core Module
///
/// The database layer and the error type everything else builds on.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, SchemaAdminError};
