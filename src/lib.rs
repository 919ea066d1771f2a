// Core infrastructure modules
pub mod core;

pub mod config;
pub mod shared;

#[cfg(test)]
mod test_utils;

pub use crate::config::DbConfig;
pub use crate::core::db::{
    type_codes, Bindings, Connection, ConnectionManager, Connector, ParamType, ResultSet, Row,
    Session, SqliteConnector, SqliteSession, Value,
};
pub use crate::core::{DbError, OrAbort, Result};
