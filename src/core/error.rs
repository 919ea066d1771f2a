/// dbfacade Error Module
///
/// This module defines the error type returned by every database operation.
/// Each failure stage of a statement's life (connect, charset negotiation,
/// prepare, bind, execute) has its own variant so callers can tell them apart.
use thiserror::Error;

/// Error type for the dbfacade crate.
///
/// The first six variants map one-to-one onto the stages of talking to the
/// database client:
/// - Connection establishment and charset negotiation
/// - Statement preparation, parameter binding and execution
/// - Transaction control
///
/// The remaining variants cover configuration, shared-state locking and the
/// I/O and JSON conversions used by the configuration loader and the CLI.
#[derive(Error, Debug)]
pub enum DbError {
    /// The client could not open a session
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The requested character set could not be applied to the session
    #[error("Error loading character set {charset}: {reason}")]
    Charset { charset: String, reason: String },

    /// The SQL text was rejected while preparing the statement
    #[error("Failed to prepare statement: {0}")]
    Prepare(String),

    /// Parameters did not match the statement's placeholders
    #[error("Failed to bind parameters: {0}")]
    Bind(String),

    /// The prepared statement failed while running or fetching rows
    #[error("Query execution failed: {0}")]
    Execute(String),

    /// BEGIN / COMMIT / ROLLBACK was rejected by the client
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The shared manager's mutex was poisoned
    #[error("Failed to acquire database lock: {0}")]
    Lock(String),

    /// Client errors outside the statement lifecycle
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Turns a failed result into process termination.
///
/// The library never exits on its own. Callers that have no recovery path
/// (scripts, the bundled CLI) can opt back into fail-fast behavior with
/// `manager.query(..).or_abort()`.
pub trait OrAbort<T> {
    /// Returns the success value, or logs the error, prints it to stderr and
    /// exits with status 1.
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "aborting after unrecoverable database error");
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}
