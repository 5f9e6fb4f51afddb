//! Table definitions for the song-play warehouse.
//!
//! Two staging tables receive the raw JSON files as-is. The star schema built
//! from them has one fact table (`songplays`) and four dimensions
//! (`users`, `songs`, `artists`, `time`).

use crate::sql::{Column, SqlType, Table};
use crate::warehouse_column;

// =============================================================================
// Staging Tables
// =============================================================================

/// Raw event log records. Column order matches the event jsonpaths document.
pub const STAGING_EVENTS_TABLE: Table = Table {
    name: "staging_events",
    columns: &[
        warehouse_column!("artist", SqlType::Varchar),
        warehouse_column!("auth", SqlType::Varchar),
        warehouse_column!("firstName", SqlType::Varchar),
        warehouse_column!("gender", SqlType::Varchar),
        warehouse_column!("itemInSession", SqlType::Int),
        warehouse_column!("lastName", SqlType::Varchar),
        warehouse_column!("length", SqlType::Float),
        warehouse_column!("level", SqlType::Varchar),
        warehouse_column!("location", SqlType::Varchar),
        warehouse_column!("method", SqlType::Varchar),
        warehouse_column!("page", SqlType::Varchar),
        warehouse_column!("registration", SqlType::Varchar),
        warehouse_column!("sessionId", SqlType::Int),
        warehouse_column!("song", SqlType::Varchar),
        warehouse_column!("status", SqlType::Int),
        warehouse_column!("ts", SqlType::BigInt), // epoch milliseconds
        warehouse_column!("userAgent", SqlType::Varchar),
        warehouse_column!("userId", SqlType::Int),
    ],
};

/// Raw song metadata, one record per song file.
pub const STAGING_SONGS_TABLE: Table = Table {
    name: "staging_songs",
    columns: &[
        warehouse_column!("song_id", SqlType::Varchar, is_primary_key = true),
        warehouse_column!("artist_id", SqlType::Varchar),
        warehouse_column!("artist_latitude", SqlType::Float),
        warehouse_column!("artist_longitude", SqlType::Float),
        warehouse_column!("artist_location", SqlType::Varchar),
        warehouse_column!("artist_name", SqlType::Varchar),
        warehouse_column!("duration", SqlType::Float),
        warehouse_column!("num_songs", SqlType::Int),
        warehouse_column!("title", SqlType::Varchar),
        warehouse_column!("year", SqlType::Int),
    ],
};

// =============================================================================
// Fact Table
// =============================================================================

pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        warehouse_column!(
            "songplay_id",
            SqlType::Int,
            identity = Some((0, 1)),
            is_primary_key = true
        ),
        warehouse_column!(
            "start_time",
            SqlType::Timestamp,
            sort_key = true,
            dist_key = true
        ),
        warehouse_column!("user_id", SqlType::Int),
        warehouse_column!("level", SqlType::Varchar),
        warehouse_column!("song_id", SqlType::Varchar),
        warehouse_column!("artist_id", SqlType::Varchar),
        warehouse_column!("session_id", SqlType::Int),
        warehouse_column!("location", SqlType::Varchar),
        warehouse_column!("user_agent", SqlType::Varchar),
    ],
};

// =============================================================================
// Dimension Tables
// =============================================================================

pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        warehouse_column!("user_id", SqlType::Int, is_primary_key = true),
        warehouse_column!("first_name", SqlType::Varchar),
        warehouse_column!("last_name", SqlType::Varchar),
        warehouse_column!("gender", SqlType::Varchar),
        warehouse_column!("level", SqlType::Varchar), // 'free' or 'paid'
    ],
};

pub const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        warehouse_column!("song_id", SqlType::Varchar, is_primary_key = true),
        warehouse_column!("title", SqlType::Varchar),
        warehouse_column!("artist_id", SqlType::Varchar),
        warehouse_column!("year", SqlType::Int),
        warehouse_column!("duration", SqlType::Float),
    ],
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        warehouse_column!("artist_id", SqlType::Varchar, is_primary_key = true),
        warehouse_column!("artist_name", SqlType::Varchar),
        warehouse_column!("location", SqlType::Varchar),
        warehouse_column!("latitude", SqlType::Float),
        warehouse_column!("longitude", SqlType::Float),
    ],
};

pub const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        warehouse_column!(
            "start_time",
            SqlType::Timestamp,
            is_primary_key = true,
            sort_key = true,
            dist_key = true
        ),
        warehouse_column!("hour", SqlType::Int),
        warehouse_column!("day", SqlType::Int),
        warehouse_column!("week", SqlType::Int),
        warehouse_column!("month", SqlType::Int),
        warehouse_column!("year", SqlType::Int),
        warehouse_column!("weekday", SqlType::Int), // 0 = Sunday
    ],
};

pub const STAGING_TABLES: &[&Table] = &[&STAGING_EVENTS_TABLE, &STAGING_SONGS_TABLE];

pub const DIMENSION_TABLES: &[&Table] = &[&USERS_TABLE, &SONGS_TABLE, &ARTISTS_TABLE, &TIME_TABLE];

/// Every table, in creation order.
pub const ALL_TABLES: &[&Table] = &[
    &STAGING_EVENTS_TABLE,
    &STAGING_SONGS_TABLE,
    &SONGPLAYS_TABLE,
    &USERS_TABLE,
    &SONGS_TABLE,
    &ARTISTS_TABLE,
    &TIME_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Dialect;
    use rusqlite::Connection;

    fn create_all(conn: &Connection) {
        for table in ALL_TABLES {
            conn.execute(&table.create_sql(Dialect::Sqlite), []).unwrap();
        }
    }

    #[test]
    fn test_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn);

        for table in ALL_TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table.name],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table.name);
        }
    }

    #[test]
    fn test_ddl_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn);
        create_all(&conn);

        for table in ALL_TABLES {
            conn.execute(&table.drop_sql(Dialect::Sqlite), []).unwrap();
            conn.execute(&table.drop_sql(Dialect::Sqlite), []).unwrap();
        }
    }

    #[test]
    fn test_every_table_has_a_primary_key_except_staging_events() {
        for table in ALL_TABLES {
            if table.name == STAGING_EVENTS_TABLE.name {
                assert!(table.primary_key().is_none());
            } else {
                assert!(table.primary_key().is_some(), "{} has no key", table.name);
            }
        }
    }

    #[test]
    fn test_redshift_layout_keys() {
        let songplays = SONGPLAYS_TABLE.create_sql(Dialect::Redshift);
        assert!(songplays.contains("songplay_id INT IDENTITY(0,1) PRIMARY KEY"));
        assert!(songplays.contains("start_time TIMESTAMP WITHOUT TIME ZONE SORTKEY DISTKEY"));

        let time = TIME_TABLE.create_sql(Dialect::Redshift);
        assert!(time.contains("start_time TIMESTAMP WITHOUT TIME ZONE PRIMARY KEY SORTKEY DISTKEY"));

        let staging = STAGING_EVENTS_TABLE.create_sql(Dialect::Redshift);
        assert!(staging.starts_with("CREATE TABLE IF NOT EXISTS staging_events ("));
        assert!(staging.contains("ts INT8"));
    }

    #[test]
    fn test_weekday_is_an_integer() {
        let weekday = TIME_TABLE.column("weekday").unwrap();
        assert_eq!(weekday.sql_type, SqlType::Int);
        assert!(TIME_TABLE
            .create_sql(Dialect::Redshift)
            .contains("weekday INT"));
    }

    #[test]
    fn test_staging_events_column_order() {
        assert_eq!(
            STAGING_EVENTS_TABLE.column_names(),
            vec![
                "artist",
                "auth",
                "firstName",
                "gender",
                "itemInSession",
                "lastName",
                "length",
                "level",
                "location",
                "method",
                "page",
                "registration",
                "sessionId",
                "song",
                "status",
                "ts",
                "userAgent",
                "userId",
            ]
        );
    }
}
