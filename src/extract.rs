//! Record extraction: turn one song-metadata or event-log file into table rows.
//!
//! Both file kinds are read as a sequence of JSON objects (newline-delimited
//! in practice, though any whitespace between objects is accepted).
//! Extraction is a direct projection of fields; the only derived values are
//! the calendar fields of `TimeEntry` and the song/artist ids of `SongPlay`.
use crate::error::{EtlError, Result};
use crate::records::{Artist, LogRows, Song, SongPlay, TimeEntry, User};
use serde_json::{Map, Value};
use std::path::Path;

/// Only events with this `page` value describe a song being played.
pub const NEXT_SONG_PAGE: &str = "NextSong";

const SONG_FIELDS: [&str; 9] = [
    "song_id",
    "title",
    "artist_id",
    "year",
    "duration",
    "artist_name",
    "artist_location",
    "artist_latitude",
    "artist_longitude",
];

/// Resolves an event's (title, artist name, duration) to (song_id, artist_id).
///
/// A miss is `Ok(None)`, not an error.
pub trait SongLookup {
    fn find_song(&self, title: &str, artist: &str, duration: f64)
        -> Result<Option<(String, String)>>;
}

/// Extract the Song and Artist rows from a song-metadata file.
///
/// The file should hold exactly one record. If it holds more, the first one
/// wins and the rest are ignored with a warning.
pub fn extract_song_file(path: &Path) -> Result<(Song, Artist)> {
    let records = read_objects(path)?;
    let Some((line, first)) = records.first() else {
        return Err(EtlError::malformed(path, "no records in song file"));
    };
    if records.len() > 1 {
        tracing::warn!(
            path = %path.display(),
            records = records.len(),
            "song file holds more than one record, using the first"
        );
    }

    let f = Fields::new(path, *line, first);
    f.require_present(&SONG_FIELDS)?;

    let song = Song {
        song_id: f.required_str("song_id")?,
        title: f.required_str("title")?,
        artist_id: f.required_str("artist_id")?,
        year: f.required_i64("year")?,
        duration: f.required_f64("duration")?,
    };
    let artist = Artist {
        artist_id: song.artist_id.clone(),
        name: f.required_str("artist_name")?,
        location: f.optional_str("artist_location")?,
        latitude: f.optional_f64("artist_latitude")?,
        longitude: f.optional_f64("artist_longitude")?,
    };
    Ok((song, artist))
}

/// Extract Time, User and SongPlay rows from an event-log file.
///
/// Only `NextSong` events are kept; each one yields exactly one row of each
/// kind, in file order. Song and artist ids are filled in through `lookup`
/// and left empty when it finds nothing.
pub fn extract_log_file(path: &Path, lookup: &dyn SongLookup) -> Result<LogRows> {
    let mut rows = LogRows::default();

    for (line, record) in read_objects(path)? {
        if record.get("page").and_then(Value::as_str) != Some(NEXT_SONG_PAGE) {
            continue;
        }
        let f = Fields::new(path, line, &record);

        let ts = f.required_i64("ts")?;
        let time = TimeEntry::from_epoch_millis(ts)
            .ok_or_else(|| f.invalid("ts", "timestamp out of range"))?;
        let user_id = f.user_id("userId")?;
        let level = f.required_str("level")?;
        let session_id = f.required_i64("sessionId")?;

        let song = f.optional_str("song")?;
        let artist = f.optional_str("artist")?;
        let length = f.optional_f64("length")?;
        let ids = match (song.as_deref(), artist.as_deref(), length) {
            (Some(title), Some(name), Some(duration)) => {
                lookup.find_song(title, name, duration)?
            }
            _ => None,
        };
        if ids.is_none() {
            tracing::trace!(line, song = ?song, artist = ?artist, "no song match");
        }
        let (song_id, artist_id) = ids.unzip();

        rows.time.push(time);
        rows.users.push(User {
            user_id,
            first_name: f.optional_str("firstName")?,
            last_name: f.optional_str("lastName")?,
            gender: f.optional_str("gender")?,
            level: level.clone(),
        });
        rows.songplays.push(SongPlay {
            start_time: ts,
            user_id,
            level,
            song_id,
            artist_id,
            session_id,
            location: f.optional_str("location")?,
            user_agent: f.optional_str("userAgent")?,
        });
    }

    Ok(rows)
}

/// Parse every top-level JSON object in the file, paired with the 1-based
/// line it starts on.
fn read_objects(path: &Path) -> Result<Vec<(usize, Map<String, Value>)>> {
    let content = std::fs::read_to_string(path).map_err(|e| EtlError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut stream = serde_json::Deserializer::from_str(&content).into_iter::<Value>();
    let mut records = Vec::new();
    loop {
        let offset = stream.byte_offset();
        let Some(next) = stream.next() else { break };
        let value = next.map_err(|e| EtlError::MalformedRecord {
            path: path.to_path_buf(),
            line: Some(e.line()),
            field: None,
            reason: format!("invalid JSON: {e}"),
        })?;
        let line = line_of_next_token(&content, offset);
        match value {
            Value::Object(map) => records.push((line, map)),
            other => {
                return Err(EtlError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: Some(line),
                    field: None,
                    reason: format!("expected a JSON object, found {}", json_kind(&other)),
                })
            }
        }
    }
    Ok(records)
}

fn line_of_next_token(content: &str, offset: usize) -> usize {
    let rest = &content[offset..];
    let start = offset + (rest.len() - rest.trim_start().len());
    content[..start].matches('\n').count() + 1
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed, error-reporting access to one record's fields.
struct Fields<'a> {
    path: &'a Path,
    line: usize,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(path: &'a Path, line: usize, map: &'a Map<String, Value>) -> Self {
        Self { path, line, map }
    }

    fn missing(&self, field: &str) -> EtlError {
        EtlError::missing_field(self.path, self.line, field)
    }

    fn invalid(&self, field: &str, reason: &str) -> EtlError {
        EtlError::MalformedRecord {
            path: self.path.to_path_buf(),
            line: Some(self.line),
            field: Some(field.to_string()),
            reason: format!("field `{field}`: {reason}"),
        }
    }

    /// Keys must exist, but may hold `null`.
    fn require_present(&self, fields: &[&str]) -> Result<()> {
        match fields.iter().find(|f| !self.map.contains_key(**f)) {
            Some(field) => Err(self.missing(field)),
            None => Ok(()),
        }
    }

    fn non_null(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn required_str(&self, field: &str) -> Result<String> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    fn optional_str(&self, field: &str) -> Result<Option<String>> {
        match self.non_null(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "expected a string")),
        }
    }

    fn required_i64(&self, field: &str) -> Result<i64> {
        let v = self.non_null(field).ok_or_else(|| self.missing(field))?;
        as_integer(v).ok_or_else(|| self.invalid(field, "expected an integer"))
    }

    fn required_f64(&self, field: &str) -> Result<f64> {
        self.optional_f64(field)?.ok_or_else(|| self.missing(field))
    }

    fn optional_f64(&self, field: &str) -> Result<Option<f64>> {
        match self.non_null(field) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "expected a number")),
        }
    }

    /// User ids arrive as strings (`"8"`) in event logs; plain numbers are
    /// accepted too. An empty string means a logged-out user and counts as
    /// missing.
    fn user_id(&self, field: &str) -> Result<i64> {
        match self.non_null(field) {
            None => Err(self.missing(field)),
            Some(Value::String(s)) if s.trim().is_empty() => Err(self.missing(field)),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| self.invalid(field, "not an integer id")),
            Some(v) => as_integer(v).ok_or_else(|| self.invalid(field, "not an integer id")),
        }
    }
}

/// Integers, including floats with no fractional part (`1541121934796.0`).
fn as_integer(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
