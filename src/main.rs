use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songplays_warehouse::cli_style::{
    get_styles, print_check_report, print_phase_reports, print_success,
};
use songplays_warehouse::config::{
    AppConfig, Backend, CliConfig, FileConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DB_PORT,
};
use songplays_warehouse::sql::Dialect;
use songplays_warehouse::{
    run_checks, EtlPipeline, Phase, QuerySet, RedshiftWarehouse, SqliteWarehouse, Warehouse,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, about = "Builds the song play star schema")]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, global = true, env = "DWH_CONFIG", value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Warehouse to run against.
    #[clap(long, global = true, env = "DWH_BACKEND", default_value = "redshift")]
    pub backend: Backend,

    /// Cluster endpoint.
    #[clap(long, global = true, env = "DWH_HOST")]
    pub host: Option<String>,

    #[clap(long, global = true, env = "DWH_DB_NAME")]
    pub db_name: Option<String>,

    #[clap(long, global = true, env = "DWH_DB_USER")]
    pub db_user: Option<String>,

    #[clap(long, global = true, env = "DWH_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[clap(long, global = true, env = "DWH_DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub db_port: u16,

    /// Seconds to wait for the cluster connection.
    #[clap(
        long,
        global = true,
        env = "DWH_CONNECT_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
    )]
    pub connect_timeout_secs: u64,

    /// Role the cluster assumes to read the source bucket.
    #[clap(long, global = true, env = "DWH_IAM_ROLE_ARN")]
    pub iam_role_arn: Option<String>,

    /// Event log files (S3 prefix, or a local directory for sqlite).
    #[clap(long, global = true, env = "DWH_LOG_DATA")]
    pub log_data: Option<String>,

    /// Jsonpaths document mapping event fields onto staging columns.
    #[clap(long, global = true, env = "DWH_LOG_JSONPATH")]
    pub log_jsonpath: Option<String>,

    /// Song metadata files (S3 prefix, or a local directory for sqlite).
    #[clap(long, global = true, env = "DWH_SONG_DATA")]
    pub song_data: Option<String>,

    /// Path to the SQLite database file used by the sqlite backend.
    #[clap(long, global = true, env = "DWH_SQLITE_PATH", value_parser = parse_path)]
    pub sqlite_path: Option<PathBuf>,

    /// Seconds of difference allowed when matching event length to song
    /// duration. 0 requires exact equality.
    #[clap(long, global = true, env = "DWH_DURATION_TOLERANCE", default_value_t = 0.0)]
    pub duration_tolerance: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Drops every table and creates it again, empty.
    CreateTables,

    /// Loads the staging tables and fills the star schema from them.
    /// Tables must already exist.
    Etl,

    /// Full rebuild: create-tables followed by etl.
    Run,

    /// Runs the data quality checks, exits with an error on any violation.
    Check,

    /// Prints the SQL that would be run, without connecting.
    PrintSql {
        /// Only print the statements of one phase.
        #[clap(long)]
        phase: Option<Phase>,
    },
}

impl Command {
    /// Whether the command renders or runs the copy phase, which needs the
    /// staging sources.
    fn loads_staging(&self) -> bool {
        match self {
            Command::Etl | Command::Run => true,
            Command::PrintSql { phase } => matches!(phase, None | Some(Phase::Copy)),
            Command::CreateTables | Command::Check => false,
        }
    }
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            backend: self.backend,
            host: self.host.clone(),
            db_name: self.db_name.clone(),
            db_user: self.db_user.clone(),
            db_password: self.db_password.clone(),
            db_port: self.db_port,
            connect_timeout_secs: self.connect_timeout_secs,
            iam_role_arn: self.iam_role_arn.clone(),
            log_data: self.log_data.clone(),
            log_jsonpath: self.log_jsonpath.clone(),
            song_data: self.song_data.clone(),
            sqlite_path: self.sqlite_path.clone(),
            duration_tolerance: self.duration_tolerance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let queries = if cli_args.command.loads_staging() {
        config.query_set()?
    } else {
        config.schema_query_set()
    };

    // Nothing to connect to when only rendering SQL
    if let Command::PrintSql { phase } = &cli_args.command {
        print_sql(&queries, *phase);
        return Ok(());
    }

    match config.backend {
        Backend::Redshift => {
            let warehouse = RedshiftWarehouse::connect(config.cluster()?).await?;
            let mut pipeline = EtlPipeline::new(warehouse, queries);
            let result = run_command(&mut pipeline, &cli_args.command).await;
            let closed = pipeline.into_warehouse().close().await;
            settle(result, closed)
        }
        Backend::Sqlite => {
            let warehouse = SqliteWarehouse::open(config.sqlite_path()?)?;
            let mut pipeline = EtlPipeline::new(warehouse, queries);
            run_command(&mut pipeline, &cli_args.command).await
        }
    }
}

/// The command outcome is returned as is; a failure to close the connection
/// afterwards is only logged.
fn settle(result: Result<()>, closed: Result<()>) -> Result<()> {
    if let Err(err) = closed {
        warn!("Failed to close warehouse connection: {:#}", err);
    }
    result
}

async fn run_command<W: Warehouse>(
    pipeline: &mut EtlPipeline<W>,
    command: &Command,
) -> Result<()> {
    match command {
        Command::CreateTables => {
            let reports = pipeline.reset_schema().await?;
            print_phase_reports(&reports);
            print_success("Tables created");
        }
        Command::Etl => {
            let reports = pipeline.run_etl().await?;
            print_phase_reports(&reports);
            print_success("Warehouse loaded");
        }
        Command::Run => {
            let reports = pipeline.run_all().await?;
            print_phase_reports(&reports);
            print_success("Warehouse rebuilt");
        }
        Command::Check => {
            let report = run_checks(pipeline.warehouse()).await?;
            print_check_report(&report);
            if !report.passed() {
                bail!("{} data quality checks failed", report.failures().len());
            }
        }
        Command::PrintSql { .. } => unreachable!("print-sql returns before connecting"),
    }
    Ok(())
}

fn print_sql(queries: &QuerySet, only: Option<Phase>) {
    let wanted = |phase: Phase| only.map_or(true, |p| p == phase);

    for (phase, statements) in [(Phase::Drop, &queries.drop), (Phase::Create, &queries.create)] {
        if wanted(phase) {
            for statement in statements {
                println!("-- {}\n{};\n", statement.label, statement.sql);
            }
        }
    }
    if wanted(Phase::Copy) {
        for load in &queries.copy {
            match queries.dialect {
                Dialect::Redshift => println!("-- {}\n{};\n", load.label(), load.to_sql()),
                Dialect::Sqlite => println!(
                    "-- {}: read JSON files under {} (local loader)\n",
                    load.label(),
                    load.source
                ),
            }
        }
    }
    if wanted(Phase::Insert) {
        for statement in &queries.insert {
            println!("-- {}\n{};\n", statement.label, statement.sql);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("songplays-warehouse").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_staging_needed_only_by_loading_commands() {
        assert!(parse(&["etl"]).command.loads_staging());
        assert!(parse(&["run"]).command.loads_staging());
        assert!(parse(&["print-sql"]).command.loads_staging());
        assert!(parse(&["print-sql", "--phase", "copy"]).command.loads_staging());
        assert!(!parse(&["check"]).command.loads_staging());
        assert!(!parse(&["create-tables"]).command.loads_staging());
        assert!(!parse(&["print-sql", "--phase", "create"]).command.loads_staging());
        assert!(!parse(&["print-sql", "--phase", "insert"]).command.loads_staging());
    }

    #[test]
    fn test_print_create_without_sources() {
        let args = parse(&["--backend", "sqlite", "print-sql", "--phase", "create"]);
        let config = AppConfig::resolve(&args.to_cli_config(), None).unwrap();
        assert!(config.query_set().is_err());

        let queries = config.schema_query_set();
        assert_eq!(queries.create.len(), 7);
    }

    #[test]
    fn test_settle_keeps_command_error() {
        let result = settle(Err(anyhow!("insert failed")), Err(anyhow!("close failed")));
        assert_eq!(result.unwrap_err().to_string(), "insert failed");
    }

    #[test]
    fn test_settle_ignores_close_error_after_success() {
        assert!(settle(Ok(()), Err(anyhow!("close failed"))).is_ok());
    }
}
