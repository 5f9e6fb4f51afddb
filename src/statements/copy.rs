use crate::schema::{STAGING_EVENTS_TABLE, STAGING_SONGS_TABLE};
use crate::sql::{quote_literal, Table};

/// Region of the bucket holding the source data.
pub const COPY_REGION: &str = "us-west-2";

/// How JSON fields map onto staging table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Keys are matched to column names.
    Auto,
    /// Location of a jsonpaths document, one path per column in column order.
    JsonPaths(String),
}

/// Bulk load of a set of JSON files into a staging table.
#[derive(Debug, Clone)]
pub struct StagingLoad {
    pub table: &'static Table,
    pub source: String,
    pub iam_role_arn: String,
    pub format: JsonFormat,
    /// Time format for timestamp columns, `None` leaves the warehouse default.
    pub time_format: Option<&'static str>,
}

impl StagingLoad {
    pub fn events(log_data: &str, log_jsonpath: &str, iam_role_arn: &str) -> Self {
        Self {
            table: &STAGING_EVENTS_TABLE,
            source: log_data.to_string(),
            iam_role_arn: iam_role_arn.to_string(),
            format: JsonFormat::JsonPaths(log_jsonpath.to_string()),
            time_format: Some("epochmillisecs"),
        }
    }

    pub fn songs(song_data: &str, iam_role_arn: &str) -> Self {
        Self {
            table: &STAGING_SONGS_TABLE,
            source: song_data.to_string(),
            iam_role_arn: iam_role_arn.to_string(),
            format: JsonFormat::Auto,
            time_format: None,
        }
    }

    pub fn label(&self) -> String {
        format!("copy {}", self.table.name)
    }

    /// Renders the warehouse COPY statement.
    pub fn to_sql(&self) -> String {
        let format = match &self.format {
            JsonFormat::Auto => quote_literal("auto"),
            JsonFormat::JsonPaths(path) => quote_literal(path),
        };
        let mut sql = format!(
            "COPY {} FROM {}\n\
             CREDENTIALS {}\n\
             REGION {}\n\
             FORMAT AS JSON {}",
            self.table.name,
            quote_literal(&self.source),
            quote_literal(&format!("aws_iam_role={}", self.iam_role_arn)),
            quote_literal(COPY_REGION),
            format
        );
        if let Some(time_format) = self.time_format {
            sql.push_str(&format!("\nTIMEFORMAT AS {}", quote_literal(time_format)));
        }
        sql
    }
}
