//! SQL Server session over a pooled connection.

use bb8::PooledConnection;
use bb8_tiberius::ConnectionManager;
use migrator_engine::{MigrateResult, Param, PlaceholderStyle, Session, Value, bind_named};
use tiberius::ToSql;
use tracing::debug;

use crate::error::MssqlResult;
use crate::types::{row_values, to_sql_params};

/// A session holding one pooled SQL Server connection.
pub struct MssqlSession {
    client: PooledConnection<'static, ConnectionManager>,
}

impl MssqlSession {
    pub(crate) fn new(client: PooledConnection<'static, ConnectionManager>) -> Self {
        Self { client }
    }

    async fn batch(&mut self, sql: &str) -> MssqlResult<()> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }

    async fn run(&mut self, sql: &str, params: &[Param]) -> MssqlResult<u64> {
        if params.is_empty() {
            self.batch(sql).await?;
            return Ok(0);
        }

        let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::AtP);
        let values = to_sql_params(&order);
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        Ok(self.client.execute(sql, &refs).await?.total())
    }

    async fn fetch(&mut self, sql: &str, params: &[Param]) -> MssqlResult<Vec<Vec<Value>>> {
        let rows = if params.is_empty() {
            self.client.simple_query(sql).await?.into_first_result().await?
        } else {
            let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::AtP);
            let values = to_sql_params(&order);
            let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            self.client.query(sql, &refs).await?.into_first_result().await?
        };
        Ok(rows.into_iter().map(row_values).collect())
    }
}

#[async_trait::async_trait]
impl Session for MssqlSession {
    async fn begin(&mut self) -> MigrateResult<()> {
        debug!("Beginning transaction");
        Ok(self.batch("BEGIN TRANSACTION").await?)
    }

    async fn commit(&mut self) -> MigrateResult<()> {
        debug!("Committing transaction");
        Ok(self.batch("COMMIT").await?)
    }

    async fn rollback(&mut self) -> MigrateResult<()> {
        debug!("Rolling back transaction");
        Ok(self.batch("ROLLBACK").await?)
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> MigrateResult<u64> {
        Ok(self.run(sql, params).await?)
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Vec<Value>>> {
        Ok(self.fetch(sql, params).await?)
    }
}
