/// Database Client Adapter
///
/// This module describes the external database client as two traits,
/// `Connector` (opens sessions) and `Session` (runs statements on one open
/// session), and implements them on top of rusqlite. `ConnectionManager` only
/// talks to these traits, so tests can substitute a fake client.
use super::row::{ResultSet, Row};
use super::statement::trailing_sql;
use super::value::Value;
use crate::config::DbConfig;
use crate::core::{DbError, Result};
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;
use tracing::debug;

/// Parameters for one statement, with their positional type codes.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    /// One marker per value, see [`super::value::type_codes`]
    pub type_codes: &'a str,
    pub values: &'a [Value],
}

/// Opens sessions against a database.
pub trait Connector {
    type Session: Session;

    /// Establishes a new session using the connection settings in `config`.
    /// Charset negotiation is a separate step, see [`Session::set_charset`].
    fn open(&self, config: &DbConfig) -> Result<Self::Session>;
}

/// One live session with the database client.
pub trait Session {
    /// Negotiates the text encoding for the session.
    fn set_charset(&mut self, charset: &str) -> Result<()>;

    /// Prepares `sql`, binds `bindings` positionally, executes and
    /// materializes every result row.
    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<ResultSet>;

    /// Row id generated by the most recent successful insert, 0 if none.
    fn last_insert_id(&self) -> i64;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    /// `false` while an explicit transaction is open.
    fn is_autocommit(&self) -> bool;

    /// Releases the session.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens rusqlite sessions. `DbConfig::database` is the database file path;
/// host and credentials have no meaning for an embedded engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

/// A rusqlite connection implementing [`Session`].
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn open(&self, config: &DbConfig) -> Result<SqliteSession> {
        debug!(
            host = %config.host,
            user = %config.username,
            database = %config.database,
            "opening sqlite session"
        );

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&config.database, flags)
            .map_err(|e| DbError::Connection(format!("{}: {}", config.database, e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(SqliteSession { conn })
    }
}

impl SqliteSession {
    /// Direct access to the underlying rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Running count of rows changed on `conn`, including changes made by triggers.
fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.prepare_cached("SELECT total_changes()")?
        .query_row([], |row| row.get(0))
}

/// Maps a client-side charset name onto a SQLite text encoding.
pub fn sqlite_encoding(charset: &str) -> Option<&'static str> {
    match charset.to_ascii_lowercase().as_str() {
        "utf8" | "utf-8" | "utf8mb4" => Some("UTF-8"),
        "utf16" | "utf-16" => Some("UTF-16"),
        "utf16le" | "utf-16le" => Some("UTF-16le"),
        "utf16be" | "utf-16be" => Some("UTF-16be"),
        _ => None,
    }
}

impl Session for SqliteSession {
    fn set_charset(&mut self, charset: &str) -> Result<()> {
        let charset_error = |reason: String| DbError::Charset {
            charset: charset.to_string(),
            reason,
        };

        let encoding = sqlite_encoding(charset)
            .ok_or_else(|| charset_error("unsupported character set".to_string()))?;

        self.conn
            .execute_batch(&format!("PRAGMA encoding = '{}';", encoding))
            .map_err(|e| charset_error(e.to_string()))?;

        let active: String = self
            .conn
            .query_row("PRAGMA encoding", [], |row| row.get(0))
            .map_err(|e| charset_error(e.to_string()))?;

        // Plain UTF-16 resolves to the native byte order.
        let matches = active.eq_ignore_ascii_case(encoding)
            || (encoding == "UTF-16" && active.to_ascii_uppercase().starts_with("UTF-16"));
        if !matches {
            return Err(charset_error(format!("database is encoded as {}", active)));
        }

        debug!(charset, encoding = %active, "negotiated session encoding");
        Ok(())
    }

    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<ResultSet> {
        let exec_error = |e: rusqlite::Error| DbError::Execute(e.to_string());

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DbError::Prepare(e.to_string()))?;
        if let Some(rest) = trailing_sql(sql) {
            return Err(DbError::Prepare(format!(
                "multiple statements are not supported, found trailing \"{}\"",
                rest.trim()
            )));
        }

        let expected = stmt.parameter_count();
        if expected != bindings.values.len() {
            return Err(DbError::Bind(format!(
                "statement expects {} parameters, got {} (types \"{}\")",
                expected,
                bindings.values.len(),
                bindings.type_codes
            )));
        }
        for (i, value) in bindings.values.iter().enumerate() {
            stmt.raw_bind_parameter(i + 1, value)
                .map_err(|e| DbError::Bind(e.to_string()))?;
        }

        let changes_before = total_changes(&self.conn).map_err(exec_error)?;

        let column_count = stmt.column_count();
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = Vec::new();
        if column_count == 0 {
            stmt.raw_execute().map_err(exec_error)?;
        } else {
            let shared: Arc<[String]> = columns.clone().into();
            let mut cursor = stmt.raw_query();
            while let Some(row) = cursor.next().map_err(exec_error)? {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(Value::from(row.get_ref(i).map_err(exec_error)?));
                }
                rows.push(Row::new(Arc::clone(&shared), values));
            }
        }

        // sqlite3_changes() keeps the last DML count across DDL and
        // transaction control, so measure this statement's own delta.
        let changes_after = total_changes(&self.conn).map_err(exec_error)?;
        let rows_affected = usize::try_from(changes_after - changes_before).unwrap_or(0);

        Ok(ResultSet::new(columns, rows, rows_affected))
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn begin(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| DbError::Database(e))
    }
}
