//! Database connection and transaction primitives.

use std::sync::Arc;
use std::time::Duration;

use libsql::{Builder, Connection as LibsqlConnection, Database, Transaction, params_from_iter};
use tracing::debug;

use crate::schema::{DbValue, Row, TableSchema};
use crate::sql::{build_delete_sql, build_insert_sql, build_select_sql, build_upsert_sql};
use crate::{Error, Result};

/// Where and how to open the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub database_url: String,
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    pub fn in_memory() -> Self {
        Self::local(":memory:")
    }

    pub fn local(path: impl Into<String>) -> Self {
        Self {
            database_url: path.into(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// An open libsql database with one connection.
///
/// Files are checked one after another, so a single connection serves the
/// whole store; clones share it.
#[derive(Clone)]
pub struct DbConnection {
    inner: Arc<ConnectionInner>,
    config: ConnectionConfig,
}

struct ConnectionInner {
    // Keep the Database alive for the lifetime of the connection.
    _database: Database,
    connection: LibsqlConnection,
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DbConnection {
    /// Open (and create if needed) the database described by `config`.
    pub async fn open(config: ConnectionConfig) -> Result<Self> {
        let url = config.database_url.trim();
        if url.is_empty() {
            return Err(Error::Config {
                details: "database_url must be provided".to_string(),
            });
        }
        if config.timeout_ms == 0 {
            return Err(Error::Config {
                details: "timeout_ms must be greater than zero".to_string(),
            });
        }

        let path = url.strip_prefix("file:").unwrap_or(url);
        let timeout = Duration::from_millis(config.timeout_ms);
        let database = tokio::time::timeout(timeout, Builder::new_local(path).build())
            .await
            .map_err(|_| Error::Connection {
                details: format!(
                    "Timed out after {}ms while opening database '{path}'",
                    config.timeout_ms
                ),
            })?
            .map_err(|source| Error::Libsql {
                context: format!("open database '{path}'"),
                source,
            })?;

        let connection = database.connect().map_err(|source| Error::Libsql {
            context: "connect database".to_string(),
            source,
        })?;
        connection
            .busy_timeout(timeout)
            .map_err(|source| Error::Libsql {
                context: "set busy timeout".to_string(),
                source,
            })?;

        debug!(database = %path, "Opened issue database");
        Ok(Self {
            inner: Arc::new(ConnectionInner {
                _database: database,
                connection,
            }),
            config,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Create the given tables and their scope indexes if they do not exist.
    pub async fn apply_tables(&self, tables: &[TableSchema]) -> Result<()> {
        for table in tables {
            self.execute(&table.create_table_sql(), Vec::new()).await?;
            if let Some(index) = table.create_scope_index_sql() {
                self.execute(&index, Vec::new()).await?;
            }
        }
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<DbTransaction> {
        let transaction =
            self.inner
                .connection
                .transaction()
                .await
                .map_err(|source| Error::Libsql {
                    context: "begin transaction".to_string(),
                    source,
                })?;
        Ok(DbTransaction {
            transaction: Some(transaction),
        })
    }

    pub(crate) async fn execute(&self, sql: &str, params: Vec<libsql::Value>) -> Result<u64> {
        execute(&self.inner.connection, sql, params).await
    }

    /// Rows of `table` matching every column of `filter`.
    pub async fn select_rows(
        &self,
        table: &str,
        filter: &Row,
        order_by: Option<&str>,
    ) -> Result<Vec<Row>> {
        let (sql, params) = build_select_sql(table, filter, order_by);
        self.query_rows(table, &sql, params).await
    }

    pub(crate) async fn query_rows(
        &self,
        table: &str,
        sql: &str,
        params: Vec<libsql::Value>,
    ) -> Result<Vec<Row>> {
        let mut rows = self
            .inner
            .connection
            .query(sql, params_from_iter(params))
            .await
            .map_err(|source| Error::Sql {
                statement: sql.to_string(),
                source,
            })?;

        let mut output = Vec::new();
        while let Some(row) = rows.next().await.map_err(|source| Error::Sql {
            statement: sql.to_string(),
            source,
        })? {
            output.push(libsql_row_to_row(table, &row)?);
        }
        Ok(output)
    }

    pub async fn table_row_count(&self, table: &str) -> Result<usize> {
        let rows = self
            .query_rows(
                table,
                &format!(
                    "SELECT COUNT(*) AS N FROM {}",
                    crate::sql::quote_identifier(table)
                ),
                Vec::new(),
            )
            .await?;
        match rows.first().and_then(|row| row.get("N")) {
            Some(DbValue::Integer(count)) => Ok(usize::try_from(*count).unwrap_or(0)),
            _ => Ok(0),
        }
    }
}

/// Transaction spanning the writes for one checked file.
pub struct DbTransaction {
    transaction: Option<Transaction>,
}

impl DbTransaction {
    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }

    fn active(&self) -> Result<&Transaction> {
        self.transaction.as_ref().ok_or_else(|| Error::Transaction {
            details: "Transaction is no longer active".to_string(),
        })
    }

    pub async fn insert_row(&mut self, table: &str, row: &Row) -> Result<()> {
        if row.is_empty() {
            return Err(Error::Query {
                table: table.to_string(),
                details: "Insert row cannot be empty".to_string(),
            });
        }
        let (sql, params) = build_insert_sql(table, row);
        execute(self.active()?, &sql, params).await?;
        Ok(())
    }

    pub async fn upsert_row(&mut self, table: &str, key_column: &str, row: &Row) -> Result<()> {
        if !row.contains_key(key_column) {
            return Err(Error::Query {
                table: table.to_string(),
                details: format!("Upsert key column '{key_column}' is missing"),
            });
        }
        let (sql, params) = build_upsert_sql(table, key_column, row);
        execute(self.active()?, &sql, params).await?;
        Ok(())
    }

    /// Delete rows matching `filter`; an empty filter is rejected.
    pub async fn delete_rows(&mut self, table: &str, filter: &Row) -> Result<u64> {
        if filter.is_empty() {
            return Err(Error::Query {
                table: table.to_string(),
                details: "Delete filter cannot be empty".to_string(),
            });
        }
        let (sql, params) = build_delete_sql(table, filter);
        execute(self.active()?, &sql, params).await
    }

    pub async fn commit(mut self) -> Result<()> {
        let tx = self.transaction.take().ok_or_else(|| Error::Transaction {
            details: "Transaction is no longer active".to_string(),
        })?;
        tx.commit().await.map_err(|source| Error::Libsql {
            context: "commit transaction".to_string(),
            source,
        })
    }

    pub async fn rollback(mut self) -> Result<()> {
        let tx = self.transaction.take().ok_or_else(|| Error::Transaction {
            details: "Transaction is no longer active".to_string(),
        })?;
        tx.rollback().await.map_err(|source| Error::Libsql {
            context: "rollback transaction".to_string(),
            source,
        })
    }
}

async fn execute(connection: &LibsqlConnection, sql: &str, params: Vec<libsql::Value>) -> Result<u64> {
    connection
        .execute(sql, params_from_iter(params))
        .await
        .map_err(|source| Error::Sql {
            statement: sql.to_string(),
            source,
        })
}

fn libsql_row_to_row(table: &str, row: &libsql::Row) -> Result<Row> {
    let mut record = Row::new();
    for idx in 0..row.column_count() {
        let column_name = row.column_name(idx).ok_or_else(|| Error::Query {
            table: table.to_string(),
            details: format!("Missing column name for index {idx}"),
        })?;
        let value = row.get_value(idx).map_err(|source| Error::Query {
            table: table.to_string(),
            details: format!("Failed to read column '{column_name}': {source}"),
        })?;
        record.insert(column_name.to_string(), DbValue::from_libsql(value));
    }
    Ok(record)
}
