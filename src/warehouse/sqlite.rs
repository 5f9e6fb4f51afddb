use super::{load_json_files, Warehouse};
use crate::sql::Dialect;
use crate::statements::StagingLoad;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Single-file warehouse for local runs. Bulk loads read JSON files from the
/// local filesystem instead of object storage.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening local warehouse at {:?}", path);
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open local warehouse {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory warehouse")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let rows = self.conn.execute(sql, [])?;
        Ok(rows as u64)
    }

    async fn query_i64(&mut self, sql: &str) -> Result<i64> {
        let value = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value)
    }

    async fn bulk_load(&mut self, load: &StagingLoad) -> Result<u64> {
        let rows = load_json_files(&mut self.conn, load)?;
        Ok(rows)
    }
}
