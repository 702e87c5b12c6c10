//! # som-store
//!
//! Issue store for model check results.
//!
//! Issues are persisted in a libsql database with one table per issue kind
//! plus an `entities` ledger of every checked element and group. Writes for
//! one checked file go through a single transaction scoped to
//! (project, run date, file), so re-checking a file replaces its earlier
//! rows instead of duplicating them.

pub mod connection;
pub mod reader;
pub mod schema;
mod sql;
pub mod writer;

pub use connection::{ConnectionConfig, DbConnection, DbTransaction};
pub use reader::{IssueReader, StoredIssue};
pub use schema::{
    ColumnDef, ColumnType, DbValue, IssueField, Row, TableSchema, entities_table, issue_table,
    issue_table_name, store_tables,
};
pub use writer::{FileScope, IssueStore, IssueTransaction};

use thiserror::Error;

/// Errors that can occur when working with the issue store.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Connection error: {details}")]
    Connection { details: String },

    #[error("Libsql error during {context}: {source}")]
    Libsql {
        context: String,
        #[source]
        source: libsql::Error,
    },

    #[error("SQL error executing `{statement}`: {source}")]
    Sql {
        statement: String,
        #[source]
        source: libsql::Error,
    },

    #[error("Query error on `{table}`: {details}")]
    Query { table: String, details: String },

    #[error("Transaction error: {details}")]
    Transaction { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
