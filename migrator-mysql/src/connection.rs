//! MySQL session over a pooled connection.

use migrator_engine::{MigrateResult, Param, PlaceholderStyle, Session, Value, bind_named};
use mysql_async::prelude::*;
use mysql_async::{Conn, Row};
use tracing::debug;

use crate::error::{MysqlError, MysqlResult};
use crate::types::{row_values, to_params};

/// A session holding one pooled MySQL connection.
pub struct MysqlSession {
    conn: Conn,
}

impl MysqlSession {
    pub(crate) fn new(conn: Conn) -> Self {
        Self { conn }
    }

    async fn run(&mut self, sql: &str, params: &[Param]) -> MysqlResult<u64> {
        if params.is_empty() {
            self.conn.query_drop(sql).await?;
        } else {
            let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::Question);
            self.conn.exec_drop(sql, to_params(&order)).await?;
        }
        Ok(self.conn.affected_rows())
    }

    async fn fetch(&mut self, sql: &str, params: &[Param]) -> MysqlResult<Vec<Vec<Value>>> {
        let rows: Vec<Row> = if params.is_empty() {
            self.conn.query(sql).await?
        } else {
            let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::Question);
            self.conn.exec(sql, to_params(&order)).await?
        };
        Ok(rows.into_iter().map(row_values).collect())
    }
}

#[async_trait::async_trait]
impl Session for MysqlSession {
    async fn begin(&mut self) -> MigrateResult<()> {
        debug!("Beginning transaction");
        self.conn
            .query_drop("START TRANSACTION")
            .await
            .map_err(MysqlError::from)?;
        Ok(())
    }

    async fn commit(&mut self) -> MigrateResult<()> {
        debug!("Committing transaction");
        self.conn.query_drop("COMMIT").await.map_err(MysqlError::from)?;
        Ok(())
    }

    async fn rollback(&mut self) -> MigrateResult<()> {
        debug!("Rolling back transaction");
        self.conn.query_drop("ROLLBACK").await.map_err(MysqlError::from)?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> MigrateResult<u64> {
        Ok(self.run(sql, params).await?)
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Vec<Value>>> {
        Ok(self.fetch(sql, params).await?)
    }
}
