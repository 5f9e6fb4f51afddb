mod file_config;

pub use file_config::{
    ClusterConfig, FileConfig, IamRoleConfig, LocalConfig, S3Config, TransformConfig,
};

use crate::sql::Dialect;
use crate::statements::{DurationMatch, QuerySet, StagingSources};
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PORT: u16 = 5439;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// Redshift cluster, data loaded from S3
    #[default]
    Redshift,
    /// Local SQLite file, data loaded from local JSON files
    Sqlite,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub backend: Backend,
    pub host: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_port: u16,
    pub connect_timeout_secs: u64,
    pub iam_role_arn: Option<String>,
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
    pub sqlite_path: Option<PathBuf>,
    pub duration_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub connect_timeout_secs: u64,
}

/// Source locations as configured. Checked only when a command needs them,
/// see [`AppConfig::sources`].
#[derive(Debug, Clone, Default)]
pub struct SourceSettings {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
    pub iam_role_arn: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    pub sources: SourceSettings,
    pub duration_match: DurationMatch,

    // Connection settings, only required by commands talking to a warehouse
    pub cluster: Option<ClusterSettings>,
    pub sqlite_path: Option<PathBuf>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let backend = match file.backend {
            Some(s) => parse_backend(&s)
                .ok_or_else(|| anyhow!("Unknown backend '{}', expected redshift or sqlite", s))?,
            None => cli.backend,
        };

        let s3 = file.s3.unwrap_or_default();
        let sources = SourceSettings {
            log_data: s3.log_data.or_else(|| cli.log_data.clone()),
            log_jsonpath: s3.log_jsonpath.or_else(|| cli.log_jsonpath.clone()),
            song_data: s3.song_data.or_else(|| cli.song_data.clone()),
            iam_role_arn: file
                .iam_role
                .unwrap_or_default()
                .arn
                .or_else(|| cli.iam_role_arn.clone()),
        };

        let cluster = resolve_cluster(cli, file.cluster.unwrap_or_default())?;

        let sqlite_path = file
            .local
            .unwrap_or_default()
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.sqlite_path.clone());

        let duration_tolerance = file
            .transform
            .unwrap_or_default()
            .duration_tolerance
            .unwrap_or(cli.duration_tolerance);
        if !duration_tolerance.is_finite() {
            bail!("duration_tolerance must be a finite number");
        }

        Ok(Self {
            backend,
            sources,
            duration_match: DurationMatch::from_tolerance(duration_tolerance),
            cluster,
            sqlite_path,
        })
    }

    pub fn dialect(&self) -> Dialect {
        match self.backend {
            Backend::Redshift => Dialect::Redshift,
            Backend::Sqlite => Dialect::Sqlite,
        }
    }

    /// Staging sources for the copy phase. All three locations are required,
    /// the IAM role only on Redshift since the local loader never reads it.
    pub fn sources(&self) -> Result<StagingSources> {
        let sources = &self.sources;
        let iam_role_arn = match self.backend {
            Backend::Redshift => required(
                sources.iam_role_arn.clone(),
                "iam_role.arn",
                "--iam-role-arn",
            )?,
            Backend::Sqlite => sources.iam_role_arn.clone().unwrap_or_default(),
        };
        Ok(StagingSources {
            log_data: required(sources.log_data.clone(), "s3.log_data", "--log-data")?,
            log_jsonpath: required(
                sources.log_jsonpath.clone(),
                "s3.log_jsonpath",
                "--log-jsonpath",
            )?,
            song_data: required(sources.song_data.clone(), "s3.song_data", "--song-data")?,
            iam_role_arn,
        })
    }

    pub fn query_set(&self) -> Result<QuerySet> {
        Ok(QuerySet::new(
            self.dialect(),
            &self.sources()?,
            self.duration_match,
        ))
    }

    /// Query set for commands that never load staging: the copy statements
    /// are rendered with whatever sources are configured, possibly empty.
    pub fn schema_query_set(&self) -> QuerySet {
        let sources = StagingSources {
            log_data: self.sources.log_data.clone().unwrap_or_default(),
            log_jsonpath: self.sources.log_jsonpath.clone().unwrap_or_default(),
            song_data: self.sources.song_data.clone().unwrap_or_default(),
            iam_role_arn: self.sources.iam_role_arn.clone().unwrap_or_default(),
        };
        QuerySet::new(self.dialect(), &sources, self.duration_match)
    }

    pub fn cluster(&self) -> Result<&ClusterSettings> {
        self.cluster.as_ref().ok_or_else(|| {
            anyhow!("cluster.host must be specified via --host or in config file")
        })
    }

    pub fn sqlite_path(&self) -> Result<&Path> {
        self.sqlite_path.as_deref().ok_or_else(|| {
            anyhow!("local.db_path must be specified via --sqlite-path or in config file")
        })
    }
}

/// Cluster settings are all-or-nothing: without a host there is no cluster,
/// with a host every other connection key is required.
fn resolve_cluster(cli: &CliConfig, file: ClusterConfig) -> Result<Option<ClusterSettings>> {
    let host = match file.host.or_else(|| cli.host.clone()) {
        Some(host) => host,
        None => return Ok(None),
    };

    Ok(Some(ClusterSettings {
        host,
        port: file.db_port.unwrap_or(cli.db_port),
        db_name: required(file.db_name.or_else(|| cli.db_name.clone()), "cluster.db_name", "--db-name")?,
        db_user: required(file.db_user.or_else(|| cli.db_user.clone()), "cluster.db_user", "--db-user")?,
        db_password: required(
            file.db_password.or_else(|| cli.db_password.clone()),
            "cluster.db_password",
            "--db-password",
        )?,
        connect_timeout_secs: file
            .connect_timeout_secs
            .unwrap_or(cli.connect_timeout_secs),
    }))
}

fn required(value: Option<String>, key: &str, flag: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} must be specified via {} or in config file", key, flag),
    }
}

/// Parses a backend string into Backend.
/// Uses clap's ValueEnum trait for parsing.
fn parse_backend(s: &str) -> Option<Backend> {
    Backend::from_str(s, true).ok()
}
