/// Connection Management Module
///
/// This module provides the `ConnectionManager`: a lazily opened, single
/// database connection with parameterized query execution, row fetching and
/// transaction control.
use super::client::{Bindings, Connector, Session, SqliteConnector};
use super::row::{ResultSet, Row};
use super::value::{type_codes, Value};
use crate::config::DbConfig;
use crate::core::Result;
use std::fmt;
use tracing::{debug, trace, warn};

/// The live connection owned by a `ConnectionManager`.
#[derive(Debug)]
pub struct Connection<S> {
    id: u64,
    session: S,
}

impl<S> Connection<S> {
    /// Identifier unique among the connections opened by one manager.
    /// A reopened connection always gets a new id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

/// Owns at most one open database connection.
///
/// The connection is opened on first use and kept until [`close`] is called
/// or the manager is dropped. All methods take `&mut self`, so a manager is
/// used by one caller at a time; wrap it in a mutex (see [`crate::shared`])
/// to share it between threads.
///
/// [`close`]: ConnectionManager::close
///
/// # Examples
///
/// ```
/// use dbfacade::{params, ConnectionManager, DbConfig};
///
/// let mut db = ConnectionManager::new(DbConfig::for_database(":memory:"));
/// db.query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
/// db.query("INSERT INTO users (name) VALUES (?)", &params!["alice"])?;
/// assert_eq!(db.last_insert_id()?, 1);
///
/// let row = db.fetch_one("SELECT name FROM users WHERE id = ?", &params![1])?;
/// assert_eq!(row.unwrap()["name"].as_str(), Some("alice"));
/// # Ok::<(), dbfacade::DbError>(())
/// ```
pub struct ConnectionManager<C: Connector = SqliteConnector> {
    config: DbConfig,
    connector: C,
    connection: Option<Connection<C::Session>>,
    opened: u64,
}

impl<C: Connector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("connection", &self.connection.as_ref().map(|c| c.id))
            .field("opened", &self.opened)
            .finish()
    }
}

impl ConnectionManager<SqliteConnector> {
    /// Creates a manager backed by SQLite. No connection is opened yet.
    pub fn new(config: DbConfig) -> Self {
        ConnectionManager::with_connector(config, SqliteConnector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates a manager that opens sessions through `connector`.
    pub fn with_connector(config: DbConfig, connector: C) -> Self {
        ConnectionManager {
            config,
            connector,
            connection: None,
            opened: 0,
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Checks if there's an active database connection
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the live connection, opening it and negotiating the charset
    /// on first use.
    ///
    /// # Errors
    ///
    /// `DbError::Connection` if the session cannot be opened,
    /// `DbError::Charset` if the configured charset cannot be applied. The
    /// manager stays closed in both cases.
    pub fn instance(&mut self) -> Result<&mut Connection<C::Session>> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.open()?,
        };
        Ok(self.connection.insert(connection))
    }

    fn open(&mut self) -> Result<Connection<C::Session>> {
        let mut session = self.connector.open(&self.config).map_err(|e| {
            warn!(error = %e, database = %self.config.database, "failed to open connection");
            e
        })?;

        if let Err(e) = session.set_charset(&self.config.charset) {
            warn!(error = %e, "charset negotiation failed");
            // Report the charset error, not a secondary close failure.
            let _ = session.close();
            return Err(e);
        }

        self.opened += 1;
        debug!(id = self.opened, database = %self.config.database, "connection opened");
        Ok(Connection {
            id: self.opened,
            session,
        })
    }

    /// Prepares `sql`, binds `params` positionally and executes it.
    ///
    /// # Arguments
    ///
    /// * `sql` - SQL text with `?` placeholders
    /// * `params` - One value per placeholder
    ///
    /// # Returns
    ///
    /// The executed statement's rows (for queries) and affected row count
    /// (for data-modifying statements).
    ///
    /// # Errors
    ///
    /// `DbError::Prepare`, `DbError::Bind` or `DbError::Execute` depending on
    /// the stage that failed, plus any error from opening the connection.
    /// The connection stays open and usable after a statement error.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let codes = type_codes(params);
        let connection = self.instance()?;
        trace!(id = connection.id, sql, types = %codes, "executing statement");

        let bindings = Bindings {
            type_codes: &codes,
            values: params,
        };
        connection.session.execute(sql, bindings).map_err(|e| {
            warn!(error = %e, sql, "statement failed");
            e
        })
    }

    /// Runs `sql` and returns every row in the order the database produced them.
    pub fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        Ok(self.query(sql, params)?.into_rows())
    }

    /// Runs `sql` and returns the first row, or `None` when nothing matched.
    pub fn fetch_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_rows().into_iter().next())
    }

    /// Row id generated by the most recent insert on the current connection.
    /// Returns 0 if no insert has happened since it was opened.
    pub fn last_insert_id(&mut self) -> Result<i64> {
        Ok(self.instance()?.session.last_insert_id())
    }

    pub fn begin_transaction(&mut self) -> Result<()> {
        let connection = self.instance()?;
        trace!(id = connection.id, "begin transaction");
        connection.session.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        let connection = self.instance()?;
        trace!(id = connection.id, "commit");
        connection.session.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        let connection = self.instance()?;
        trace!(id = connection.id, "rollback");
        connection.session.rollback()
    }

    /// Whether an explicit transaction is open. Reported by the client,
    /// `false` while the manager is closed.
    pub fn in_transaction(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| !c.session.is_autocommit())
            .unwrap_or(false)
    }

    /// Releases the connection. The next operation opens a new one.
    /// Closing a closed manager does nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => {
                debug!(id = connection.id, "closing connection");
                connection.session.close()
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DbError;
    use crate::params;
    use crate::test_utils::FakeConnector;

    fn memory_manager() -> ConnectionManager {
        ConnectionManager::new(DbConfig::for_database(":memory:"))
    }

    #[test]
    fn test_connection_is_lazy_and_reused() {
        let mut db = ConnectionManager::with_connector(DbConfig::default(), FakeConnector::default());
        assert!(!db.is_open());
        assert_eq!(db.connector().opens(), 0);

        let first = db.instance().unwrap().id();
        let second = db.instance().unwrap().id();
        db.query("SELECT 1", &[]).unwrap();

        assert_eq!(first, second);
        assert_eq!(db.instance().unwrap().id(), first);
        assert_eq!(db.connector().opens(), 1);
    }

    #[test]
    fn test_close_then_reopen_creates_new_connection() {
        let mut db = ConnectionManager::with_connector(DbConfig::default(), FakeConnector::default());
        let first = db.instance().unwrap().id();

        db.close().unwrap();
        assert!(!db.is_open());
        assert_eq!(db.connector().closes(), 1);

        db.query("SELECT 1", &[]).unwrap();
        let second = db.instance().unwrap().id();
        assert_ne!(first, second);
        assert_eq!(db.connector().opens(), 2);
    }

    #[test]
    fn test_close_when_closed_is_noop() {
        let mut db = ConnectionManager::with_connector(DbConfig::default(), FakeConnector::default());
        db.close().unwrap();
        assert_eq!(db.connector().closes(), 0);
    }

    #[test]
    fn test_query_passes_type_codes_to_client() {
        let mut db = ConnectionManager::with_connector(DbConfig::default(), FakeConnector::default());
        db.query("INSERT INTO users (id, name) VALUES (?, ?)", &params![42, "alice"])
            .unwrap();
        db.query("UPDATE t SET a = ?, b = ?, c = ?", &params![1.5, vec![1u8], None::<i64>])
            .unwrap();
        assert_eq!(db.connector().type_codes(), vec!["is".to_string(), "dbn".to_string()]);
    }

    #[test]
    fn test_failed_open_leaves_manager_closed() {
        let connector = FakeConnector::failing_open();
        let mut db = ConnectionManager::with_connector(DbConfig::default(), connector);
        assert!(matches!(db.query("SELECT 1", &[]), Err(DbError::Connection(_))));
        assert!(!db.is_open());
    }

    #[test]
    fn test_charset_failure_closes_session() {
        let config = DbConfig {
            charset: "latin1".to_string(),
            ..DbConfig::default()
        };
        let mut db = ConnectionManager::with_connector(config, FakeConnector::default());
        assert!(matches!(db.instance(), Err(DbError::Charset { .. })));
        assert!(!db.is_open());
        assert_eq!(db.connector().closes(), 1);
    }

    #[test]
    fn test_sqlite_insert_and_last_insert_id() {
        let mut db = memory_manager();
        assert_eq!(db.last_insert_id().unwrap(), 0);
        db.query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, age INTEGER, name TEXT)",
            &[],
        )
        .unwrap();

        let result = db
            .query("INSERT INTO users (age, name) VALUES (?, ?)", &params![42, "alice"])
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(db.last_insert_id().unwrap(), 1);
        assert_eq!(db.last_insert_id().unwrap(), 1);

        db.query("SELECT * FROM users", &[]).unwrap();
        assert_eq!(db.last_insert_id().unwrap(), 1);
    }

    #[test]
    fn test_fetch_one_without_match_is_none() {
        let mut db = memory_manager();
        db.query("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        assert!(db.fetch_one("SELECT v FROM t WHERE v = ?", &params![1]).unwrap().is_none());
        assert!(db.fetch_all("SELECT v FROM t", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_prepare_failure_keeps_connection_usable() {
        let mut db = memory_manager();
        let id = db.instance().unwrap().id();
        assert!(matches!(db.query("SELEC * FROM nowhere", &[]), Err(DbError::Prepare(_))));
        assert!(db.is_open());
        assert_eq!(db.instance().unwrap().id(), id);
        assert!(db.fetch_one("SELECT 1 AS one", &[]).unwrap().is_some());
    }

    #[test]
    fn test_transaction_state_comes_from_client() {
        let mut db = memory_manager();
        assert!(!db.in_transaction());
        db.begin_transaction().unwrap();
        assert!(db.in_transaction());
        assert!(matches!(db.begin_transaction(), Err(DbError::Transaction(_))));
        db.commit().unwrap();
        assert!(!db.in_transaction());
        assert!(matches!(db.commit(), Err(DbError::Transaction(_))));
    }
}
