//! Database schema for the analytics warehouse.
//!
//! Star schema:
//! - songplays: fact table, one row per play event
//! - songs, artists, users, time: dimension tables
//!
//! Dimension tables carry no uniqueness constraints. Within-run
//! deduplication is pipeline policy (users are deduplicated by full-row
//! equality, so a level change legitimately yields two rows), and the time
//! dimension keeps duplicate timestamps by design.

/// SQL schema for the warehouse database (version 1).
pub const WAREHOUSE_SCHEMA_SQL: &str = r#"
-- Song dimension, one row per loadable catalog record
CREATE TABLE IF NOT EXISTS songs (
    song_id TEXT NOT NULL,
    title TEXT NOT NULL,
    artist_id TEXT NOT NULL,
    year INTEGER NOT NULL,
    duration REAL NOT NULL
);

-- Artist dimension, one row per loadable catalog record
CREATE TABLE IF NOT EXISTS artists (
    artist_id TEXT NOT NULL,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    latitude REAL,
    longitude REAL
);

-- Time dimension keyed by the event timestamp (Unix milliseconds)
CREATE TABLE IF NOT EXISTS time (
    start_time INTEGER NOT NULL,
    hour INTEGER NOT NULL,
    day INTEGER NOT NULL,
    week INTEGER NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL,
    weekday INTEGER NOT NULL
);

-- User dimension; a user whose level changed appears once per level
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gender TEXT NOT NULL,
    level TEXT NOT NULL
);

-- Songplay facts; song_id/artist_id stay null when the catalog lookup missed
CREATE TABLE IF NOT EXISTS songplays (
    songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    level TEXT NOT NULL,
    song_id TEXT,
    artist_id TEXT,
    session_id INTEGER NOT NULL,
    location TEXT NOT NULL,
    user_agent TEXT NOT NULL
);

-- Lookup path for songplay resolution: title + artist name + duration
CREATE INDEX IF NOT EXISTS idx_songs_title ON songs(title);
CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist_id);
CREATE INDEX IF NOT EXISTS idx_artists_id ON artists(artist_id);

CREATE INDEX IF NOT EXISTS idx_songplays_start_time ON songplays(start_time);
CREATE INDEX IF NOT EXISTS idx_songplays_user ON songplays(user_id);
CREATE INDEX IF NOT EXISTS idx_time_start_time ON time(start_time);
CREATE INDEX IF NOT EXISTS idx_users_id ON users(user_id);
"#;
