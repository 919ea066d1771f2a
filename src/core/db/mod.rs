/// Database Module
///
/// This module provides the data-access layer, split into:
/// - **Connection Management** (`connection.rs`): the lazily opened connection, queries and transactions
/// - **Client Adapter** (`client.rs`): the `Connector`/`Session` seam and its rusqlite implementation
/// - **Values** (`value.rs`): tagged parameter values and type-code inference
/// - **Rows** (`row.rs`): materialized result rows
/// - **Statement Boundaries** (`statement.rs`): detection of SQL after the first statement
///
/// ## Error Handling
///
/// All database operations use the `DbError` type, with one variant per
/// failure stage.
pub mod client;
pub mod connection;
pub mod row;
pub mod statement;
pub mod value;

pub use client::*;
pub use connection::*;
pub use row::*;
pub use value::*;
