/// # Test Utilities Module
///
/// A scripted stand-in for the database client, used to observe how
/// `ConnectionManager` drives sessions without touching a real database.
use crate::config::DbConfig;
use crate::core::db::{sqlite_encoding, Bindings, Connector, ResultSet, Session};
use crate::core::{DbError, Result};
use std::sync::{Arc, Mutex};

/// Counters shared between a `FakeConnector` and the sessions it opens.
#[derive(Debug, Default)]
struct FakeState {
    opens: usize,
    closes: usize,
    type_codes: Vec<String>,
}

/// Connector that records opens, closes and the type codes of every
/// executed statement.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
    fail_open: bool,
}

impl FakeConnector {
    /// A connector whose every `open` fails with `DbError::Connection`.
    pub fn failing_open() -> Self {
        FakeConnector {
            fail_open: true,
            ..FakeConnector::default()
        }
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn type_codes(&self) -> Vec<String> {
        self.state.lock().unwrap().type_codes.clone()
    }
}

#[derive(Debug)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    last_insert_id: i64,
    in_transaction: bool,
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn open(&self, config: &DbConfig) -> Result<FakeSession> {
        if self.fail_open {
            return Err(DbError::Connection(format!("refused: {}", config.host)));
        }
        self.state.lock().unwrap().opens += 1;
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            last_insert_id: 0,
            in_transaction: false,
        })
    }
}

impl Session for FakeSession {
    fn set_charset(&mut self, charset: &str) -> Result<()> {
        match sqlite_encoding(charset) {
            Some(_) => Ok(()),
            None => Err(DbError::Charset {
                charset: charset.to_string(),
                reason: "unsupported character set".to_string(),
            }),
        }
    }

    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> Result<ResultSet> {
        self.state
            .lock()
            .unwrap()
            .type_codes
            .push(bindings.type_codes.to_string());
        if sql.trim_start().to_uppercase().starts_with("INSERT") {
            self.last_insert_id += 1;
            return Ok(ResultSet::new(Vec::new(), Vec::new(), 1));
        }
        Ok(ResultSet::default())
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    fn begin(&mut self) -> Result<()> {
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.in_transaction = false;
        Ok(())
    }

    fn is_autocommit(&self) -> bool {
        !self.in_transaction
    }

    fn close(self) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_connector_counts_sessions() {
        let connector = FakeConnector::default();
        let session = connector.open(&DbConfig::default()).unwrap();
        assert_eq!(connector.opens(), 1);
        session.close().unwrap();
        assert_eq!(connector.closes(), 1);
    }

    #[test]
    fn test_fake_session_tracks_inserts() {
        let connector = FakeConnector::default();
        let mut session = connector.open(&DbConfig::default()).unwrap();
        let bindings = Bindings {
            type_codes: "",
            values: &[],
        };
        session.execute("INSERT INTO t DEFAULT VALUES", bindings).unwrap();
        session.execute("SELECT 1", bindings).unwrap();
        assert_eq!(session.last_insert_id(), 1);
        assert_eq!(connector.type_codes().len(), 2);
    }
}
