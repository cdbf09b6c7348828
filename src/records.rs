/// Row types for the five target tables, plus timestamp decomposition.
use chrono::{DateTime, Datelike, Timelike, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: String,
}

/// Calendar breakdown of one event timestamp.
///
/// `week` is the ISO-8601 week number and `weekday` counts from Monday = 0
/// to Sunday = 6. All fields are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntry {
    /// Epoch milliseconds, as found in the event's `ts`.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl TimeEntry {
    /// Decompose epoch milliseconds. Returns `None` when the value is outside
    /// the range chrono can represent.
    pub fn from_epoch_millis(ts: i64) -> Option<Self> {
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(ts)?;
        Some(Self {
            start_time: ts,
            hour: dt.hour(),
            day: dt.day(),
            week: dt.iso_week().week(),
            month: dt.month(),
            year: dt.year(),
            weekday: dt.weekday().num_days_from_monday(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongPlay {
    pub start_time: i64,
    pub user_id: i64,
    pub level: String,
    /// `None` when the lookup found no matching song/artist pair.
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything extracted from one event-log file, in file order.
#[derive(Debug, Default)]
pub struct LogRows {
    pub time: Vec<TimeEntry>,
    pub users: Vec<User>,
    pub songplays: Vec<SongPlay>,
}

impl LogRows {
    pub fn is_empty(&self) -> bool {
        self.songplays.is_empty()
    }
}
