use crate::error::Result;
use crate::extract::SongLookup;
use crate::records::{Artist, Song, SongPlay, TimeEntry, User};
use crate::sql::SqlStatements;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Opens (or creates) the songplay database at the given path.
///
/// Creates the five tables if they don't already exist.
/// Returns an open connection ready for use.
pub fn open(path: &Path, sql: &SqlStatements) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_tables(&conn, sql)?;
    Ok(conn)
}

pub fn create_tables(conn: &Connection, sql: &SqlStatements) -> Result<()> {
    for ddl in sql.create_tables {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

pub fn drop_tables(conn: &Connection, sql: &SqlStatements) -> Result<()> {
    for ddl in sql.drop_tables {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

/// Drop and recreate every table, leaving an empty schema.
pub fn reset(conn: &Connection, sql: &SqlStatements) -> Result<()> {
    drop_tables(conn, sql)?;
    create_tables(conn, sql)?;
    tracing::info!("schema reset");
    Ok(())
}

/// Row count per table, in `sql.table_names` order.
pub fn table_counts(conn: &Connection, sql: &SqlStatements) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(sql.table_names.len());
    for &table in sql.table_names {
        // Table names come from the statement set, never from input data.
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        counts.push((table, count));
    }
    Ok(counts)
}

/// Executes one parameterized statement per row against an open connection.
///
/// Commit boundaries belong to the caller: pass a `Transaction` (which
/// derefs to `Connection`) to group a file's rows.
/// Every insert returns the number of rows written, which is 0 when a
/// dimension row already existed.
pub struct Loader<'c> {
    conn: &'c Connection,
    sql: &'c SqlStatements,
}

impl<'c> Loader<'c> {
    pub fn new(conn: &'c Connection, sql: &'c SqlStatements) -> Self {
        Self { conn, sql }
    }

    pub fn insert_song(&self, song: &Song) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(self.sql.song_insert)?;
        Ok(stmt.execute(params![
            song.song_id,
            song.title,
            song.artist_id,
            song.year,
            song.duration,
        ])?)
    }

    pub fn insert_artist(&self, artist: &Artist) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(self.sql.artist_insert)?;
        Ok(stmt.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude,
        ])?)
    }

    pub fn insert_user(&self, user: &User) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(self.sql.user_insert)?;
        Ok(stmt.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level,
        ])?)
    }

    pub fn insert_time(&self, time: &TimeEntry) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(self.sql.time_insert)?;
        Ok(stmt.execute(params![
            time.start_time,
            time.hour,
            time.day,
            time.week,
            time.month,
            time.year,
            time.weekday,
        ])?)
    }

    pub fn insert_songplay(&self, play: &SongPlay) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(self.sql.songplay_insert)?;
        Ok(stmt.execute(params![
            play.start_time,
            play.user_id,
            play.level,
            play.song_id,
            play.artist_id,
            play.session_id,
            play.location,
            play.user_agent,
        ])?)
    }
}

impl SongLookup for Loader<'_> {
    fn find_song(
        &self,
        title: &str,
        artist: &str,
        duration: f64,
    ) -> Result<Option<(String, String)>> {
        let mut stmt = self.conn.prepare_cached(self.sql.song_select)?;
        let ids = stmt
            .query_row(params![title, artist, duration], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        Ok(ids)
    }
}
