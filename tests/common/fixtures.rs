//! Test fixture creation for the local data lake

use super::constants::*;
use anyhow::Result;
use serde_json::{json, Value};
use songplays_warehouse::sql::Dialect;
use songplays_warehouse::{DurationMatch, EtlPipeline, QuerySet, SqliteWarehouse, StagingSources};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Event jsonpaths document, one path per staging_events column.
const LOG_JSON_PATH: &str = r#"{
    "jsonpaths": [
        "$['artist']",
        "$['auth']",
        "$['firstName']",
        "$['gender']",
        "$['itemInSession']",
        "$['lastName']",
        "$['length']",
        "$['level']",
        "$['location']",
        "$['method']",
        "$['page']",
        "$['registration']",
        "$['sessionId']",
        "$['song']",
        "$['status']",
        "$['ts']",
        "$['userAgent']",
        "$['userId']"
    ]
}"#;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

/// Song and log files laid out like the source bucket, in a temp directory.
pub struct TestDataLake {
    pub dir: TempDir,
    pub log_data: PathBuf,
    pub log_jsonpath: PathBuf,
    pub song_data: PathBuf,
}

impl TestDataLake {
    /// Creates 3 songs by 2 artists and 6 events of 2 users, 4 of which are
    /// NextSong events.
    pub fn create() -> Result<Self> {
        let dir = TempDir::new()?;
        let log_data = dir.path().join("log_data");
        let song_data = dir.path().join("song_data");
        let log_jsonpath = dir.path().join("log_json_path.json");

        fs::write(&log_jsonpath, LOG_JSON_PATH)?;

        write_song(
            &song_data.join("A/A/A"),
            json!({
                "num_songs": 1,
                "artist_id": ARTIST_1_ID,
                "artist_latitude": 34.05,
                "artist_longitude": -118.24,
                "artist_location": ARTIST_1_LOCATION,
                "artist_name": ARTIST_1_NAME,
                "song_id": SONG_1_ID,
                "title": SONG_1_TITLE,
                "duration": SONG_1_DURATION,
                "year": 2001
            }),
        )?;
        write_song(
            &song_data.join("A/A/B"),
            json!({
                "num_songs": 1,
                "artist_id": ARTIST_2_ID,
                "artist_latitude": null,
                "artist_longitude": null,
                "artist_location": "",
                "artist_name": "Other Artist",
                "song_id": SONG_2_ID,
                "title": "Other Song",
                "duration": 180.5,
                "year": 0
            }),
        )?;
        write_song(
            &song_data.join("A/B/A"),
            json!({
                "num_songs": 1,
                "artist_id": ARTIST_1_ID,
                "artist_latitude": null,
                "artist_longitude": null,
                "artist_location": "LA",
                "artist_name": ARTIST_1_NAME,
                "song_id": SONG_3_ID,
                "title": "Second Song",
                "duration": 150.0,
                "year": 2003
            }),
        )?;

        write_log(
            &log_data.join("2018/11"),
            "2018-11-14-events.json",
            &[
                next_song(USER_1_ID, "free", SONG_1_TITLE, ARTIST_1_NAME, SONG_1_DURATION, FIRST_PLAY_TS),
                json!({
                    "artist": null, "auth": "Logged In", "firstName": "Kaylee",
                    "gender": "F", "itemInSession": 1, "lastName": "Summers",
                    "length": null, "level": "free", "location": "Phoenix-Mesa-Scottsdale, AZ",
                    "method": "GET", "page": "Home", "registration": 1540344794796.0,
                    "sessionId": 139, "song": null, "status": 200, "ts": 1542241826000i64,
                    "userAgent": USER_AGENT, "userId": USER_1_ID.to_string()
                }),
                next_song(USER_1_ID, "paid", "Other Song", "Other Artist", 180.5, 1542241900000),
                next_song(USER_2_ID, "paid", "Unknown Song", "Nobody", 100.0, 1542241950000),
            ],
        )?;
        write_log(
            &log_data.join("2018/11"),
            "2018-11-15-events.json",
            &[
                next_song(USER_2_ID, "paid", SONG_1_TITLE, ARTIST_1_NAME, NEAR_MISS_LENGTH, 1542242000000),
                json!({
                    "artist": null, "auth": "Logged Out", "firstName": null,
                    "gender": null, "itemInSession": 0, "lastName": null,
                    "length": null, "level": "free", "location": null,
                    "method": "PUT", "page": "Login", "registration": null,
                    "sessionId": 52, "song": null, "status": 307, "ts": 1542242100000i64,
                    "userAgent": null, "userId": ""
                }),
            ],
        )?;

        Ok(Self {
            dir,
            log_data,
            log_jsonpath,
            song_data,
        })
    }

    pub fn sources(&self) -> StagingSources {
        StagingSources {
            log_data: path_string(&self.log_data),
            log_jsonpath: path_string(&self.log_jsonpath),
            song_data: path_string(&self.song_data),
            iam_role_arn: String::new(),
        }
    }

    /// Adds one more song file next to the fixture songs.
    pub fn add_song(&self, song: Value) -> Result<()> {
        write_song(&self.song_data.join("B/A/A"), song)
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("warehouse.db")
    }
}

/// Opens an in-memory warehouse with the query set for the data lake.
pub fn open_pipeline(
    lake: &TestDataLake,
    duration_match: DurationMatch,
) -> EtlPipeline<SqliteWarehouse> {
    let warehouse = SqliteWarehouse::open_in_memory().unwrap();
    let queries = QuerySet::new(Dialect::Sqlite, &lake.sources(), duration_match);
    EtlPipeline::new(warehouse, queries)
}

pub fn query_string(warehouse: &SqliteWarehouse, sql: &str) -> String {
    warehouse
        .connection()
        .query_row(sql, [], |row| row.get(0))
        .unwrap()
}

fn next_song(user_id: i64, level: &str, song: &str, artist: &str, length: f64, ts: i64) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": if user_id == USER_1_ID { "Kaylee" } else { "Lily" },
        "gender": "F",
        "itemInSession": 0,
        "lastName": if user_id == USER_1_ID { "Summers" } else { "Koch" },
        "length": length,
        "level": level,
        "location": "Phoenix-Mesa-Scottsdale, AZ",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1540344794796.0,
        "sessionId": 139,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": USER_AGENT,
        "userId": user_id.to_string()
    })
}

fn write_song(dir: &Path, song: Value) -> Result<()> {
    fs::create_dir_all(dir)?;
    let name = format!("{}.json", song["song_id"].as_str().unwrap_or("song"));
    fs::write(dir.join(name), serde_json::to_string_pretty(&song)?)?;
    Ok(())
}

/// Event logs hold one JSON object per line.
fn write_log(dir: &Path, name: &str, events: &[Value]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let lines: Vec<String> = events.iter().map(Value::to_string).collect();
    fs::write(dir.join(name), lines.join("\n"))?;
    Ok(())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
