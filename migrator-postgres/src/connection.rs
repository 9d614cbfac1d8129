//! PostgreSQL session over a pooled connection.

use deadpool_postgres::Object;
use migrator_engine::{MigrateResult, Param, PlaceholderStyle, Session, Value, bind_named};
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::error::{PgError, PgResult};
use crate::types::{row_values, to_sql_params};

/// A session holding one pooled PostgreSQL connection.
pub struct PgSession {
    client: Object,
}

impl PgSession {
    pub(crate) fn new(client: Object) -> Self {
        Self { client }
    }

    async fn run(&self, sql: &str, params: &[Param]) -> PgResult<u64> {
        if params.is_empty() {
            // Simple query protocol: multi-statement bodies and DO blocks work.
            self.client.batch_execute(sql).await?;
            return Ok(0);
        }

        let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::Dollar);
        let values = to_sql_params(&order)?;
        let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_ref() as _).collect();
        Ok(self.client.execute(sql.as_str(), &refs).await?)
    }

    async fn fetch(&self, sql: &str, params: &[Param]) -> PgResult<Vec<Vec<Value>>> {
        let (sql, order) = bind_named(sql, '@', params, PlaceholderStyle::Dollar);
        let values = to_sql_params(&order)?;
        let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_ref() as _).collect();

        let rows = self.client.query(sql.as_str(), &refs).await?;
        rows.iter().map(row_values).collect()
    }
}

#[async_trait::async_trait]
impl Session for PgSession {
    async fn begin(&mut self) -> MigrateResult<()> {
        debug!("Beginning transaction");
        self.client.batch_execute("BEGIN").await.map_err(PgError::from)?;
        Ok(())
    }

    async fn commit(&mut self) -> MigrateResult<()> {
        debug!("Committing transaction");
        self.client.batch_execute("COMMIT").await.map_err(PgError::from)?;
        Ok(())
    }

    async fn rollback(&mut self) -> MigrateResult<()> {
        debug!("Rolling back transaction");
        self.client.batch_execute("ROLLBACK").await.map_err(PgError::from)?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> MigrateResult<u64> {
        Ok(self.run(sql, params).await?)
    }

    async fn query(&mut self, sql: &str, params: &[Param]) -> MigrateResult<Vec<Vec<Value>>> {
        Ok(self.fetch(sql, params).await?)
    }
}
