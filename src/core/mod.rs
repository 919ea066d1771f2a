/// Core Module for dbfacade
///
/// This module contains the database layer and the shared error type.
pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, OrAbort, Result};
