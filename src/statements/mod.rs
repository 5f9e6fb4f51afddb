mod copy;
mod insert;

pub use copy::{JsonFormat, StagingLoad, COPY_REGION};
pub use insert::{
    artists_insert, songplays_insert, songs_insert, time_insert, users_insert, DurationMatch,
};

use crate::schema::ALL_TABLES;
use crate::sql::Dialect;

/// A single SQL statement with a short human readable label for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub label: String,
    pub sql: String,
}

impl Statement {
    fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sql: sql.into(),
        }
    }
}

/// Where the staging data comes from and who is allowed to read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingSources {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub iam_role_arn: String,
}

/// Every statement of a full warehouse rebuild, grouped by phase.
#[derive(Debug, Clone)]
pub struct QuerySet {
    pub dialect: Dialect,
    pub drop: Vec<Statement>,
    pub create: Vec<Statement>,
    pub copy: Vec<StagingLoad>,
    pub insert: Vec<Statement>,
}

impl QuerySet {
    pub fn new(dialect: Dialect, sources: &StagingSources, duration_match: DurationMatch) -> Self {
        let drop = ALL_TABLES
            .iter()
            .map(|t| Statement::new(format!("drop {}", t.name), t.drop_sql(dialect)))
            .collect();
        let create = ALL_TABLES
            .iter()
            .map(|t| Statement::new(format!("create {}", t.name), t.create_sql(dialect)))
            .collect();
        let copy = vec![
            StagingLoad::events(
                &sources.log_data,
                &sources.log_jsonpath,
                &sources.iam_role_arn,
            ),
            StagingLoad::songs(&sources.song_data, &sources.iam_role_arn),
        ];
        // time reads from songplays, so songplays goes first
        let insert = vec![
            Statement::new(
                "insert songplays",
                songplays_insert(dialect, duration_match),
            ),
            Statement::new("insert users", users_insert()),
            Statement::new("insert songs", songs_insert()),
            Statement::new("insert artists", artists_insert()),
            Statement::new("insert time", time_insert(dialect)),
        ];

        Self {
            dialect,
            drop,
            create,
            copy,
            insert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> StagingSources {
        StagingSources {
            log_data: "s3://udacity-dend/log_data".to_string(),
            log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
            song_data: "s3://udacity-dend/song_data".to_string(),
            iam_role_arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
        }
    }

    #[test]
    fn test_query_set_sizes() {
        let queries = QuerySet::new(Dialect::Redshift, &sources(), DurationMatch::Exact);
        assert_eq!(queries.drop.len(), 7);
        assert_eq!(queries.create.len(), 7);
        assert_eq!(queries.copy.len(), 2);
        assert_eq!(queries.insert.len(), 5);
    }

    #[test]
    fn test_query_set_ddl_is_idempotent_text() {
        let queries = QuerySet::new(Dialect::Redshift, &sources(), DurationMatch::Exact);
        assert!(queries
            .drop
            .iter()
            .all(|s| s.sql.starts_with("DROP TABLE IF EXISTS ")));
        assert!(queries
            .create
            .iter()
            .all(|s| s.sql.starts_with("CREATE TABLE IF NOT EXISTS ")));
    }

    #[test]
    fn test_insert_order_starts_with_fact_and_ends_with_time() {
        let queries = QuerySet::new(Dialect::Sqlite, &sources(), DurationMatch::Exact);
        let labels: Vec<&str> = queries.insert.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "insert songplays",
                "insert users",
                "insert songs",
                "insert artists",
                "insert time"
            ]
        );
    }

    #[test]
    fn test_copy_loads_reference_sources() {
        let queries = QuerySet::new(Dialect::Redshift, &sources(), DurationMatch::Exact);
        assert_eq!(queries.copy[0].table.name, "staging_events");
        assert_eq!(
            queries.copy[0].format,
            JsonFormat::JsonPaths("s3://udacity-dend/log_json_path.json".to_string())
        );
        assert_eq!(queries.copy[1].table.name, "staging_songs");
        assert_eq!(queries.copy[1].source, "s3://udacity-dend/song_data");
    }
}
