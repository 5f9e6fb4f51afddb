//! Songplays Warehouse Library
//!
//! Builds a star schema of song plays out of raw event logs and song
//! metadata: staging tables are bulk loaded from JSON, then the fact and
//! dimension tables are derived from them with SQL.

pub mod checks;
pub mod cli_style;
pub mod config;
pub mod pipeline;
pub mod schema;
pub mod sql;
pub mod statements;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use checks::{run_checks, CheckReport};
pub use config::{AppConfig, Backend};
pub use pipeline::{EtlPipeline, Phase, PhaseReport};
pub use statements::{DurationMatch, QuerySet, StagingSources};
pub use warehouse::{RedshiftWarehouse, SqliteWarehouse, Warehouse};
