use super::Warehouse;
use crate::config::ClusterSettings;
use crate::sql::Dialect;
use crate::statements::StagingLoad;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor, Row};
use std::time::Duration;
use tracing::{info, instrument};

/// Redshift cluster reached over the Postgres wire protocol.
pub struct RedshiftWarehouse {
    conn: PgConnection,
}

impl RedshiftWarehouse {
    #[instrument(skip_all, fields(host = %cluster.host, db = %cluster.db_name), err)]
    pub async fn connect(cluster: &ClusterSettings) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&cluster.host)
            .port(cluster.port)
            .username(&cluster.db_user)
            .password(&cluster.db_password)
            .database(&cluster.db_name);

        info!(
            "Connecting to warehouse at {}:{}/{}...",
            cluster.host, cluster.port, cluster.db_name
        );
        let conn = tokio::time::timeout(
            Duration::from_secs(cluster.connect_timeout_secs),
            PgConnection::connect_with(&options),
        )
        .await
        .with_context(|| {
            format!(
                "Timed out after {}s connecting to {}",
                cluster.connect_timeout_secs, cluster.host
            )
        })?
        .with_context(|| format!("Failed to connect to {}", cluster.host))?;

        Ok(Self { conn })
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    fn dialect(&self) -> Dialect {
        Dialect::Redshift
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        // The reborrow needs a concrete type for Executor to resolve inside async_trait
        let conn: &mut PgConnection = &mut self.conn;
        let result = Executor::execute(conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn query_i64(&mut self, sql: &str) -> Result<i64> {
        let conn: &mut PgConnection = &mut self.conn;
        let row = Executor::fetch_one(conn, sqlx::query(sql)).await?;
        let value: i64 = row.try_get(0)?;
        Ok(value)
    }

    async fn bulk_load(&mut self, load: &StagingLoad) -> Result<u64> {
        self.execute(&load.to_sql()).await
    }
}
