//! Process-wide shared connection manager.
//!
//! For code that cannot pass a `ConnectionManager` around, this module keeps
//! one manager behind a mutex. It is initialized explicitly with a config;
//! every access is serialized through the lock.
use crate::config::DbConfig;
use crate::core::db::ConnectionManager;
use crate::core::{DbError, Result};
use once_cell::sync::OnceCell;
use std::sync::Mutex;
use tracing::debug;

/// Global manager state. Set once by [`init`].
static SHARED: OnceCell<Mutex<ConnectionManager>> = OnceCell::new();

/// Installs the process-wide manager. No connection is opened until the
/// first call to [`with`] needs one.
///
/// # Errors
///
/// `DbError::Config` if the shared manager was already initialized.
pub fn init(config: DbConfig) -> Result<()> {
    debug!(database = %config.database, "initializing shared connection manager");
    SHARED
        .set(Mutex::new(ConnectionManager::new(config)))
        .map_err(|_| DbError::Config("shared connection manager already initialized".to_string()))
}

pub fn is_initialized() -> bool {
    SHARED.get().is_some()
}

/// Runs `f` with exclusive access to the shared manager.
///
/// # Errors
///
/// `DbError::Config` if [`init`] has not been called, `DbError::Lock` if a
/// previous holder panicked, or whatever `f` returns.
///
/// # Examples
///
/// ```
/// use dbfacade::{params, shared, DbConfig};
///
/// shared::init(DbConfig::for_database(":memory:"))?;
/// let count = shared::with(|db| {
///     db.query("CREATE TABLE t (v INTEGER)", &[])?;
///     db.query("INSERT INTO t (v) VALUES (?)", &params![1])?;
///     Ok(db.fetch_all("SELECT v FROM t", &[])?.len())
/// })?;
/// assert_eq!(count, 1);
/// # Ok::<(), dbfacade::DbError>(())
/// ```
pub fn with<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut ConnectionManager) -> Result<T>,
{
    let state = SHARED
        .get()
        .ok_or_else(|| DbError::Config("shared connection manager not initialized".to_string()))?;
    let mut guard = state.lock().map_err(|e| DbError::Lock(e.to_string()))?;
    f(&mut guard)
}
