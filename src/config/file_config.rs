use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Warehouse backend: "redshift" or "sqlite"
    pub backend: Option<String>,

    pub cluster: Option<ClusterConfig>,
    pub iam_role: Option<IamRoleConfig>,
    pub s3: Option<S3Config>,
    pub local: Option<LocalConfig>,
    pub transform: Option<TransformConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClusterConfig {
    pub host: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_port: Option<u16>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct IamRoleConfig {
    pub arn: Option<String>,
}

/// Source locations. For the sqlite backend these are local paths.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct S3Config {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LocalConfig {
    pub db_path: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TransformConfig {
    /// Seconds of difference allowed between event length and song duration.
    pub duration_tolerance: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
