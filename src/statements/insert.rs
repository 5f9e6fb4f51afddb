//! `INSERT ... SELECT` transforms from the staging tables into the star schema.

use crate::sql::{DatePart, Dialect};

/// How `staging_events.length` is matched against `staging_songs.duration`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DurationMatch {
    /// Exact float equality.
    #[default]
    Exact,
    /// Absolute difference within the given number of seconds.
    Tolerance(f64),
}

impl DurationMatch {
    /// A tolerance of zero (or less) means exact matching.
    pub fn from_tolerance(tolerance: f64) -> Self {
        if tolerance > 0.0 {
            DurationMatch::Tolerance(tolerance)
        } else {
            DurationMatch::Exact
        }
    }

    fn condition(&self, event_length: &str, song_duration: &str) -> String {
        match self {
            DurationMatch::Exact => format!("{} = {}", event_length, song_duration),
            DurationMatch::Tolerance(eps) => {
                format!("ABS({} - {}) <= {}", event_length, song_duration, eps)
            }
        }
    }
}

/// Play events joined to the song they played. An event whose length is
/// close to several songs (same title and artist) keeps only the closest one,
/// lowest song_id on ties, so there is never more than one row per event.
pub fn songplays_insert(dialect: Dialect, duration_match: DurationMatch) -> String {
    format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
FROM (
    SELECT
        {start_time} AS start_time,
        events.userId AS user_id,
        events.level AS level,
        songs.song_id AS song_id,
        songs.artist_id AS artist_id,
        events.sessionId AS session_id,
        events.location AS location,
        events.userAgent AS user_agent,
        ROW_NUMBER() OVER (
            PARTITION BY events.userId, events.sessionId, events.itemInSession, events.ts
            ORDER BY ABS(events.length - songs.duration), songs.song_id
        ) AS match_rank
    FROM staging_events events
    JOIN staging_songs songs
        ON events.song = songs.title
        AND events.artist = songs.artist_name
        AND {duration}
    WHERE events.page = 'NextSong'
) matched
WHERE match_rank = 1",
        start_time = dialect.epoch_millis_to_timestamp("events.ts"),
        duration = duration_match.condition("events.length", "songs.duration"),
    )
}

/// Users seen on NextSong events. A user's level can change between events,
/// the most recent event decides which row is kept.
pub fn users_insert() -> String {
    "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT user_id, first_name, last_name, gender, level
FROM (
    SELECT
        events.userId AS user_id,
        events.firstName AS first_name,
        events.lastName AS last_name,
        events.gender AS gender,
        events.level AS level,
        ROW_NUMBER() OVER (PARTITION BY events.userId ORDER BY events.ts DESC) AS row_rank
    FROM staging_events events
    WHERE events.userId IS NOT NULL
        AND events.page = 'NextSong'
) ranked
WHERE row_rank = 1"
        .to_string()
}

pub fn songs_insert() -> String {
    "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT DISTINCT
    songs.song_id AS song_id,
    songs.title AS title,
    songs.artist_id AS artist_id,
    songs.year AS year,
    songs.duration AS duration
FROM staging_songs songs
WHERE songs.song_id IS NOT NULL"
        .to_string()
}

/// Artists appear once per song, so the same artist_id can come with
/// different location spellings. The row of the lowest song_id is kept.
pub fn artists_insert() -> String {
    "INSERT INTO artists (artist_id, artist_name, location, latitude, longitude)
SELECT artist_id, artist_name, location, latitude, longitude
FROM (
    SELECT
        songs.artist_id AS artist_id,
        songs.artist_name AS artist_name,
        songs.artist_location AS location,
        songs.artist_latitude AS latitude,
        songs.artist_longitude AS longitude,
        ROW_NUMBER() OVER (PARTITION BY songs.artist_id ORDER BY songs.song_id) AS row_rank
    FROM staging_songs songs
    WHERE songs.artist_id IS NOT NULL
) ranked
WHERE row_rank = 1"
        .to_string()
}

pub fn time_insert(dialect: Dialect) -> String {
    let part = |p| dialect.extract(p, "plays.start_time");
    format!(
        "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT
    plays.start_time,
    {hour},
    {day},
    {week},
    {month},
    {year},
    {weekday}
FROM (SELECT DISTINCT start_time FROM songplays) plays",
        hour = part(DatePart::Hour),
        day = part(DatePart::Day),
        week = part(DatePart::Week),
        month = part(DatePart::Month),
        year = part(DatePart::Year),
        weekday = part(DatePart::Weekday),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_match_from_tolerance() {
        assert_eq!(DurationMatch::from_tolerance(0.0), DurationMatch::Exact);
        assert_eq!(DurationMatch::from_tolerance(-1.0), DurationMatch::Exact);
        assert_eq!(
            DurationMatch::from_tolerance(0.5),
            DurationMatch::Tolerance(0.5)
        );
    }

    #[test]
    fn test_songplays_insert_exact_match() {
        let sql = songplays_insert(Dialect::Redshift, DurationMatch::Exact);
        assert!(sql.starts_with("INSERT INTO songplays (start_time, user_id"));
        assert!(sql.contains("SELECT DISTINCT"));
        assert!(sql.contains("TIMESTAMP 'epoch' + (events.ts / 1000.0) * INTERVAL '1 second' AS start_time"));
        assert!(sql.contains("ON events.song = songs.title"));
        assert!(sql.contains("AND events.artist = songs.artist_name"));
        assert!(sql.contains("AND events.length = songs.duration"));
        assert!(sql.contains("WHERE events.page = 'NextSong'"));
        assert!(sql.ends_with("WHERE match_rank = 1"));
    }

    #[test]
    fn test_songplays_insert_with_tolerance() {
        let sql = songplays_insert(Dialect::Sqlite, DurationMatch::Tolerance(0.25));
        assert!(sql.contains("AND ABS(events.length - songs.duration) <= 0.25"));
        assert!(sql.contains("strftime('%Y-%m-%d %H:%M:%f', events.ts / 1000.0, 'unixepoch')"));
        assert!(sql.contains("ORDER BY ABS(events.length - songs.duration), songs.song_id"));
    }

    #[test]
    fn test_users_insert_filters_next_song_and_null_users() {
        let sql = users_insert();
        assert!(sql.contains("events.userId IS NOT NULL"));
        assert!(sql.contains("events.page = 'NextSong'"));
        assert!(sql.contains("PARTITION BY events.userId"));
    }

    #[test]
    fn test_time_insert_per_dialect() {
        let redshift = time_insert(Dialect::Redshift);
        assert!(redshift.contains("EXTRACT(HOUR FROM plays.start_time)"));
        assert!(redshift.contains("EXTRACT(DAYOFWEEK FROM plays.start_time)"));
        assert!(redshift.contains("FROM (SELECT DISTINCT start_time FROM songplays) plays"));

        let sqlite = time_insert(Dialect::Sqlite);
        assert!(sqlite.contains("CAST(strftime('%H', plays.start_time) AS INTEGER)"));
        assert!(sqlite.contains("CAST(strftime('%w', plays.start_time) AS INTEGER)"));
        assert!(!sqlite.contains("EXTRACT"));
    }
}
