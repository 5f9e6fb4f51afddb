//! Runs the warehouse rebuild against a [`Warehouse`] connection.
//!
//! Phases always run in the same order: drop, create, copy, insert. A failing
//! statement aborts the run, nothing is retried or rolled back.

use crate::schema::STAGING_TABLES;
use crate::statements::{QuerySet, Statement};
use crate::warehouse::Warehouse;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    Drop,
    Create,
    Copy,
    Insert,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Drop => "drop",
            Phase::Create => "create",
            Phase::Copy => "copy",
            Phase::Insert => "insert",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StatementOutcome {
    pub label: String,
    pub rows_affected: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub statements: Vec<StatementOutcome>,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            started_at: Utc::now(),
            statements: Vec::new(),
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.statements.iter().map(|s| s.rows_affected).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.statements.iter().map(|s| s.elapsed).sum()
    }

    pub fn rows_for(&self, label: &str) -> Option<u64> {
        self.statements
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.rows_affected)
    }
}

pub struct EtlPipeline<W: Warehouse> {
    warehouse: W,
    queries: QuerySet,
}

impl<W: Warehouse> EtlPipeline<W> {
    pub fn new(warehouse: W, queries: QuerySet) -> Self {
        debug_assert_eq!(
            warehouse.dialect(),
            queries.dialect,
            "query set rendered for a different dialect"
        );
        Self { warehouse, queries }
    }

    pub fn warehouse(&mut self) -> &mut W {
        &mut self.warehouse
    }

    pub fn queries(&self) -> &QuerySet {
        &self.queries
    }

    pub fn into_warehouse(self) -> W {
        self.warehouse
    }

    async fn run_statements(
        &mut self,
        phase: Phase,
        statements: &[Statement],
    ) -> Result<PhaseReport> {
        info!("Running {} phase ({} statements)", phase, statements.len());
        let mut report = PhaseReport::new(phase);
        for statement in statements {
            report
                .statements
                .push(run_statement(&mut self.warehouse, statement).await?);
        }
        info!(
            "Finished {} phase: {} rows in {:?}",
            phase,
            report.total_rows(),
            report.elapsed()
        );
        Ok(report)
    }

    pub async fn drop_tables(&mut self) -> Result<PhaseReport> {
        let statements = self.queries.drop.clone();
        self.run_statements(Phase::Drop, &statements).await
    }

    pub async fn create_tables(&mut self) -> Result<PhaseReport> {
        let statements = self.queries.create.clone();
        self.run_statements(Phase::Create, &statements).await
    }

    /// Empties the staging tables and bulk loads them from their sources.
    pub async fn load_staging_tables(&mut self) -> Result<PhaseReport> {
        let dialect = self.warehouse.dialect();
        let truncates: Vec<Statement> = STAGING_TABLES
            .iter()
            .map(|table| Statement {
                label: format!("truncate {}", table.name),
                sql: table.truncate_sql(dialect),
            })
            .collect();

        info!("Running {} phase ({} loads)", Phase::Copy, self.queries.copy.len());
        let mut report = PhaseReport::new(Phase::Copy);
        for statement in &truncates {
            report
                .statements
                .push(run_statement(&mut self.warehouse, statement).await?);
        }

        for load in &self.queries.copy {
            let label = load.label();
            info!("{} from {}", label, load.source);
            let started = Instant::now();
            let rows_affected = self
                .warehouse
                .bulk_load(load)
                .await
                .with_context(|| format!("Failed to run `{}`", label))?;
            report.statements.push(StatementOutcome {
                label,
                rows_affected,
                elapsed: started.elapsed(),
            });
        }
        info!(
            "Finished {} phase: {} rows in {:?}",
            Phase::Copy,
            report.total_rows(),
            report.elapsed()
        );
        Ok(report)
    }

    pub async fn insert_tables(&mut self) -> Result<PhaseReport> {
        let statements = self.queries.insert.clone();
        self.run_statements(Phase::Insert, &statements).await
    }

    /// Drops and recreates every table.
    pub async fn reset_schema(&mut self) -> Result<Vec<PhaseReport>> {
        Ok(vec![self.drop_tables().await?, self.create_tables().await?])
    }

    /// Loads staging and derives the star schema from it.
    pub async fn run_etl(&mut self) -> Result<Vec<PhaseReport>> {
        Ok(vec![
            self.load_staging_tables().await?,
            self.insert_tables().await?,
        ])
    }

    /// Full rebuild: drop, create, copy, insert.
    pub async fn run_all(&mut self) -> Result<Vec<PhaseReport>> {
        let mut reports = self.reset_schema().await?;
        reports.extend(self.run_etl().await?);
        Ok(reports)
    }
}

async fn run_statement<W: Warehouse>(
    warehouse: &mut W,
    statement: &Statement,
) -> Result<StatementOutcome> {
    debug!("{}:\n{}", statement.label, statement.sql);
    let started = Instant::now();
    let rows_affected = warehouse
        .execute(&statement.sql)
        .await
        .with_context(|| format!("Failed to run `{}`", statement.label))?;
    let elapsed = started.elapsed();
    info!(
        "{} done ({} rows, {:?})",
        statement.label, rows_affected, elapsed
    );
    Ok(StatementOutcome {
        label: statement.label.clone(),
        rows_affected,
        elapsed,
    })
}
