/// Pipeline driver: locate files, extract rows, load them one file per
/// transaction, report progress.
use crate::config::OnMalformed;
use crate::db::Loader;
use crate::error::Result;
use crate::extract;
use crate::locate;
use crate::sql::SqlStatements;
use rusqlite::Connection;
use std::fmt;
use std::path::Path;

/// Which extractor a data root is fed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    SongMetadata,
    EventLog,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::SongMetadata => write!(f, "song metadata"),
            RecordKind::EventLog => write!(f, "event log"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub extension: String,
    pub on_malformed: OnMalformed,
    /// Print per-stage and per-file progress lines to stdout.
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            on_malformed: OnMalformed::Abort,
            progress: true,
        }
    }
}

/// Rows actually written per table. Ignored conflicts are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}

impl RowCounts {
    fn add(&mut self, other: RowCounts) {
        self.songs += other.songs;
        self.artists += other.artists;
        self.users += other.users;
        self.time += other.time;
        self.songplays += other.songplays;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub rows: RowCounts,
}

/// Load every matching file under `root` through the extractor for `kind`.
///
/// Each file runs in its own transaction and is committed before the next
/// one starts. On error the transaction is dropped, which rolls back that
/// file's rows; earlier files stay committed. Malformed files are skipped
/// only under `OnMalformed::Skip`, everything else ends the run.
pub fn process_data(
    conn: &mut Connection,
    sql: &SqlStatements,
    root: &Path,
    kind: RecordKind,
    options: &PipelineOptions,
) -> Result<RunSummary> {
    let files = locate::find_files(root, &options.extension)?;
    let total = files.len();
    let mut summary = RunSummary {
        files_found: total,
        ..Default::default()
    };

    tracing::info!(files = total, root = %root.display(), %kind, "located input files");
    if options.progress {
        println!("{} files found in {}", total, root.display());
    }

    for (i, path) in files.iter().enumerate() {
        let tx = conn.transaction()?;
        match process_file(&tx, sql, path, kind) {
            Ok(rows) => {
                tx.commit()?;
                summary.rows.add(rows);
                summary.files_processed += 1;
                tracing::debug!(path = %path.display(), ?rows, "file committed");
            }
            Err(e) if e.is_malformed() && options.on_malformed == OnMalformed::Skip => {
                drop(tx);
                summary.files_skipped += 1;
                tracing::warn!(error = %e, "skipping malformed file");
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "file failed, aborting run");
                return Err(e);
            }
        }
        if options.progress {
            println!("{}/{} files processed.", i + 1, total);
        }
    }

    Ok(summary)
}

/// Extract and load one file inside the caller's transaction.
pub fn process_file(
    conn: &Connection,
    sql: &SqlStatements,
    path: &Path,
    kind: RecordKind,
) -> Result<RowCounts> {
    let loader = Loader::new(conn, sql);
    let mut rows = RowCounts::default();

    match kind {
        RecordKind::SongMetadata => {
            let (song, artist) = extract::extract_song_file(path)?;
            rows.songs += loader.insert_song(&song)?;
            rows.artists += loader.insert_artist(&artist)?;
        }
        RecordKind::EventLog => {
            let log = extract::extract_log_file(path, &loader)?;
            if log.is_empty() {
                tracing::debug!(path = %path.display(), "no playback events in file");
            }
            for time in &log.time {
                rows.time += loader.insert_time(time)?;
            }
            for user in &log.users {
                rows.users += loader.insert_user(user)?;
            }
            for play in &log.songplays {
                rows.songplays += loader.insert_songplay(play)?;
            }
        }
    }

    Ok(rows)
}
