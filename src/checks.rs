//! Data quality checks run after a load.
//!
//! Every check is a query returning the number of violating rows, so a
//! healthy warehouse answers zero everywhere.

use crate::schema::{
    ARTISTS_TABLE, DIMENSION_TABLES, SONGPLAYS_TABLE, SONGS_TABLE, STAGING_EVENTS_TABLE,
    USERS_TABLE,
};
use crate::sql::Table;
use crate::warehouse::Warehouse;
use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCheck {
    pub name: String,
    pub description: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub description: String,
    pub violations: i64,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.violations == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(CheckResult::passed)
    }

    pub fn failures(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }
}

fn songplays_bounded_by_events() -> QualityCheck {
    QualityCheck {
        name: "songplays_bounded".to_string(),
        description: "songplays has no more rows than NextSong events".to_string(),
        sql: format!(
            "SELECT CASE WHEN fact.n > events.n THEN fact.n - events.n ELSE 0 END
FROM (SELECT COUNT(*) AS n FROM {fact}) fact,
     (SELECT COUNT(*) AS n FROM {events} WHERE page = 'NextSong') events",
            fact = SONGPLAYS_TABLE.name,
            events = STAGING_EVENTS_TABLE.name,
        ),
    }
}

/// Songplays whose foreign key has no row in the referenced dimension.
fn references_dimension(column: &str, dimension: &Table) -> QualityCheck {
    QualityCheck {
        name: format!("songplays_{}_in_{}", column, dimension.name),
        description: format!("every songplays.{} exists in {}", column, dimension.name),
        sql: format!(
            "SELECT COUNT(*)
FROM {fact} fact
LEFT JOIN {dim} dim ON fact.{column} = dim.{column}
WHERE fact.{column} IS NOT NULL AND dim.{column} IS NULL",
            fact = SONGPLAYS_TABLE.name,
            dim = dimension.name,
            column = column,
        ),
    }
}

/// Primary key values present more than once. The warehouse does not
/// enforce primary keys, so this is checked after the fact.
fn unique_primary_key(table: &Table) -> Option<QualityCheck> {
    let key = table.primary_key()?;
    Some(QualityCheck {
        name: format!("{}_unique_{}", table.name, key.name),
        description: format!("{}.{} has no duplicates", table.name, key.name),
        sql: format!(
            "SELECT COUNT(*) FROM (
    SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1
) duplicates",
            key = key.name,
            table = table.name,
        ),
    })
}

pub fn quality_checks() -> Vec<QualityCheck> {
    let mut checks = vec![
        songplays_bounded_by_events(),
        references_dimension("user_id", &USERS_TABLE),
        references_dimension("song_id", &SONGS_TABLE),
        references_dimension("artist_id", &ARTISTS_TABLE),
    ];
    checks.extend(DIMENSION_TABLES.iter().filter_map(|t| unique_primary_key(t)));
    checks
}

pub async fn run_checks<W: Warehouse>(warehouse: &mut W) -> Result<CheckReport> {
    let mut report = CheckReport::default();
    for check in quality_checks() {
        let violations = warehouse
            .query_i64(&check.sql)
            .await
            .with_context(|| format!("Failed to run check `{}`", check.name))?;
        if violations == 0 {
            info!("Check {} passed", check.name);
        } else {
            warn!(
                "Check {} failed: {} violations ({})",
                check.name, violations, check.description
            );
        }
        report.results.push(CheckResult {
            name: check.name,
            description: check.description,
            violations,
        });
    }
    Ok(report)
}
