//! SQL statement templates for the songplay star schema.
//!
//! The full set of statements is a plain value handed to the loader, so a
//! caller can swap in a different dialect or table prefix without touching
//! process-wide state.

/// Every statement the loader and schema helpers execute.
#[derive(Debug, Clone, Copy)]
pub struct SqlStatements {
    pub songplay_insert: &'static str,
    pub user_insert: &'static str,
    pub song_insert: &'static str,
    pub artist_insert: &'static str,
    pub time_insert: &'static str,
    /// `(title, artist name, duration) -> (song_id, artist_id)`.
    pub song_select: &'static str,
    /// In dependency order: dimension tables first, songplays last.
    pub create_tables: &'static [&'static str],
    /// Fact table first so no dimension disappears under it.
    pub drop_tables: &'static [&'static str],
    pub table_names: &'static [&'static str],
}

impl SqlStatements {
    pub const SQLITE: SqlStatements = SqlStatements {
        songplay_insert: SONGPLAY_INSERT,
        user_insert: USER_INSERT,
        song_insert: SONG_INSERT,
        artist_insert: ARTIST_INSERT,
        time_insert: TIME_INSERT,
        song_select: SONG_SELECT,
        create_tables: &[
            USER_TABLE_CREATE,
            SONG_TABLE_CREATE,
            ARTIST_TABLE_CREATE,
            TIME_TABLE_CREATE,
            SONGPLAY_TABLE_CREATE,
        ],
        drop_tables: &[
            "DROP TABLE IF EXISTS songplays",
            "DROP TABLE IF EXISTS users",
            "DROP TABLE IF EXISTS songs",
            "DROP TABLE IF EXISTS artists",
            "DROP TABLE IF EXISTS time",
        ],
        table_names: &["songs", "artists", "users", "time", "songplays"],
    };
}

impl Default for SqlStatements {
    fn default() -> Self {
        Self::SQLITE
    }
}

// --- DDL ---

const SONGPLAY_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS songplays (
    songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time  INTEGER,
    user_id     INTEGER,
    level       TEXT,
    song_id     TEXT,
    artist_id   TEXT,
    session_id  INTEGER,
    location    TEXT,
    user_agent  TEXT
)";

const USER_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY,
    first_name  TEXT,
    last_name   TEXT,
    gender      TEXT,
    level       TEXT
)";

const SONG_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS songs (
    song_id     TEXT PRIMARY KEY,
    title       TEXT,
    artist_id   TEXT,
    year        INTEGER,
    duration    REAL
)";

const ARTIST_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS artists (
    artist_id   TEXT PRIMARY KEY,
    name        TEXT,
    location    TEXT,
    latitude    REAL,
    longitude   REAL
)";

const TIME_TABLE_CREATE: &str = "CREATE TABLE IF NOT EXISTS time (
    start_time  INTEGER PRIMARY KEY,
    hour        INTEGER,
    day         INTEGER,
    week        INTEGER,
    month       INTEGER,
    year        INTEGER,
    weekday     INTEGER
)";

// --- DML ---

// No conflict clause: songplays are append-only.
const SONGPLAY_INSERT: &str = "INSERT INTO songplays
    (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// Level changes after the first insert are not applied.
const USER_INSERT: &str = "INSERT INTO users (user_id, first_name, last_name, gender, level)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (user_id) DO NOTHING";

const SONG_INSERT: &str = "INSERT INTO songs (song_id, title, artist_id, year, duration)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (song_id) DO NOTHING";

const ARTIST_INSERT: &str = "INSERT INTO artists (artist_id, name, location, latitude, longitude)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT (artist_id) DO NOTHING";

const TIME_INSERT: &str = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (start_time) DO NOTHING";

// Exact equality on duration. Any re-encoding of the source floats breaks the match.
const SONG_SELECT: &str = "SELECT s.song_id, a.artist_id
    FROM songs s JOIN artists a ON s.artist_id = a.artist_id
    WHERE s.title = ?1 AND a.name = ?2 AND s.duration = ?3
    LIMIT 1";
