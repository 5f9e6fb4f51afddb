//! Shared constants for end-to-end tests
//!
//! When the fixture data changes, update only this file and fixtures.rs.

// ============================================================================
// Songs
// ============================================================================

/// "Test Song" by "Test Artist", 200.0 seconds
pub const SONG_1_ID: &str = "SOTEST0001";
pub const SONG_1_TITLE: &str = "Test Song";
pub const SONG_1_DURATION: f64 = 200.0;

/// "Other Song" by "Other Artist", 180.5 seconds
pub const SONG_2_ID: &str = "SOTEST0002";

/// "Second Song" by "Test Artist", published with a different location
pub const SONG_3_ID: &str = "SOTEST0003";

/// Not part of the fixture, see TestDataLake::add_song
pub const NEAR_DUPLICATE_SONG_ID: &str = "SOTEST0004";
pub const NEAR_DUPLICATE_DURATION: f64 = 200.2;

pub const SONG_COUNT: i64 = 3;

// ============================================================================
// Artists
// ============================================================================

pub const ARTIST_1_ID: &str = "ARTEST0001";
pub const ARTIST_1_NAME: &str = "Test Artist";
/// Location attached to SONG_1_ID, the lowest song id of the artist
pub const ARTIST_1_LOCATION: &str = "Los Angeles, CA";

pub const ARTIST_2_ID: &str = "ARTEST0002";

pub const ARTIST_COUNT: i64 = 2;

// ============================================================================
// Users
// ============================================================================

/// Starts the log as a free user and upgrades to paid
pub const USER_1_ID: i64 = 8;
/// Only listens to songs missing from the catalog (or slightly off in length)
pub const USER_2_ID: i64 = 15;

pub const USER_COUNT: i64 = 2;

// ============================================================================
// Events
// ============================================================================

/// Epoch millis of the first play of SONG_1_ID
pub const FIRST_PLAY_TS: i64 = 1542231826796;
pub const FIRST_PLAY_START_TIME: &str = "2018-11-14 21:43:46.796";

/// Length of the event that is 0.4s off SONG_1_DURATION
pub const NEAR_MISS_LENGTH: f64 = 200.4;

/// NextSong events in the logs, matched or not
pub const NEXT_SONG_EVENTS: i64 = 4;

/// Songplays with exact duration matching
pub const EXACT_SONGPLAYS: i64 = 2;
