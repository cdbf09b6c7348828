mod config;
mod db;
mod error;
mod extract;
mod locate;
mod pipeline;
mod records;
mod sql;

use clap::{Parser, ValueEnum};
use config::{EtlConfig, OnMalformed};
use pipeline::{PipelineOptions, RecordKind, RunSummary};
use sql::SqlStatements;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Load song metadata and playback event logs from nested JSON files into
/// the songs / artists / users / time / songplays tables.
#[derive(Parser, Debug)]
#[command(name = "songplay-etl", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "etl.toml")]
    config: PathBuf,

    /// Database file (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Root of the song metadata tree (overrides config)
    #[arg(long)]
    song_data: Option<PathBuf>,

    /// Root of the event log tree (overrides config)
    #[arg(long)]
    log_data: Option<PathBuf>,

    /// Which stage(s) to run. Songs always load before logs.
    #[arg(long, value_enum, default_value_t = Stage::All)]
    stage: Stage,

    /// Drop and recreate all tables before loading
    #[arg(long)]
    reset: bool,

    /// Skip files with malformed records instead of aborting the run
    #[arg(long)]
    skip_malformed: bool,

    /// Print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (per-file commits, lookup misses)
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress lines, only errors and summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Songs,
    Logs,
    All,
}

impl Stage {
    fn kinds(self) -> &'static [RecordKind] {
        match self {
            Stage::Songs => &[RecordKind::SongMetadata],
            Stage::Logs => &[RecordKind::EventLog],
            Stage::All => &[RecordKind::SongMetadata, RecordKind::EventLog],
        }
    }
}

/// Settings after merging the config file with CLI overrides.
#[derive(Debug)]
struct Settings {
    db_path: PathBuf,
    song_data: PathBuf,
    log_data: PathBuf,
    options: PipelineOptions,
}

impl Settings {
    fn resolve(cli: &Cli, config: EtlConfig) -> Self {
        let on_malformed = if cli.skip_malformed {
            OnMalformed::Skip
        } else {
            config.pipeline.on_malformed
        };
        Self {
            db_path: cli.db.clone().unwrap_or(config.database.path),
            song_data: cli.song_data.clone().unwrap_or(config.input.song_data),
            log_data: cli.log_data.clone().unwrap_or(config.input.log_data),
            options: PipelineOptions {
                extension: config.input.extension,
                on_malformed,
                progress: !cli.quiet,
            },
        }
    }

    fn root(&self, kind: RecordKind) -> &std::path::Path {
        match kind {
            RecordKind::SongMetadata => &self.song_data,
            RecordKind::EventLog => &self.log_data,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> error::Result<()> {
    let config = EtlConfig::load(&cli.config)?;
    let settings = Settings::resolve(cli, config);
    let sql = SqlStatements::default();

    if cli.dry_run {
        println!("songplay-etl v{}", env!("CARGO_PKG_VERSION"));
        println!("Config file:   {}", cli.config.display());
        println!("Database:      {}", settings.db_path.display());
        println!("Song data:     {}", settings.song_data.display());
        println!("Log data:      {}", settings.log_data.display());
        println!("Extension:     .{}", settings.options.extension);
        println!("Stage:         {:?}", cli.stage);
        println!("On malformed:  {:?}", settings.options.on_malformed);
        println!("Reset schema:  {}", cli.reset);
        println!("Dry run mode: config validated, not running.");
        return Ok(());
    }

    tracing::info!(db = %settings.db_path.display(), "songplay-etl starting");
    let mut conn = db::open(&settings.db_path, &sql)?;
    if cli.reset {
        db::reset(&conn, &sql)?;
    }

    for &kind in cli.stage.kinds() {
        let summary = pipeline::process_data(
            &mut conn,
            &sql,
            settings.root(kind),
            kind,
            &settings.options,
        )?;
        report_stage(kind, &summary);
    }

    println!();
    println!("Table row counts:");
    for (table, count) in db::table_counts(&conn, &sql)? {
        println!("  {table:<10} {count}");
    }
    Ok(())
}

fn report_stage(kind: RecordKind, summary: &RunSummary) {
    tracing::info!(
        %kind,
        found = summary.files_found,
        processed = summary.files_processed,
        skipped = summary.files_skipped,
        songs = summary.rows.songs,
        artists = summary.rows.artists,
        users = summary.rows.users,
        time = summary.rows.time,
        songplays = summary.rows.songplays,
        "stage complete"
    );
    if summary.files_skipped > 0 {
        println!(
            "{} of {} {} files skipped as malformed.",
            summary.files_skipped, summary.files_found, kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("songplay-etl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.config, PathBuf::from("etl.toml"));
        assert_eq!(cli.stage, Stage::All);
        assert!(!cli.reset);
        assert!(!cli.skip_malformed);
    }

    #[test]
    fn stage_all_runs_songs_before_logs() {
        assert_eq!(
            Stage::All.kinds(),
            &[RecordKind::SongMetadata, RecordKind::EventLog]
        );
        assert_eq!(Stage::Logs.kinds(), &[RecordKind::EventLog]);
    }

    #[test]
    fn cli_overrides_config() {
        let cli = parse(&[
            "--db",
            "other.db",
            "--log-data",
            "/srv/logs",
            "--skip-malformed",
            "--quiet",
        ]);
        let settings = Settings::resolve(&cli, EtlConfig::default());
        assert_eq!(settings.db_path, PathBuf::from("other.db"));
        assert_eq!(settings.log_data, PathBuf::from("/srv/logs"));
        assert_eq!(settings.song_data, PathBuf::from("data/song_data"));
        assert_eq!(settings.options.on_malformed, OnMalformed::Skip);
        assert!(!settings.options.progress);
    }

    #[test]
    fn config_values_survive_without_flags() {
        let cli = parse(&["--stage", "songs"]);
        let mut config = EtlConfig::default();
        config.database.path = PathBuf::from("warehouse.db");
        config.pipeline.on_malformed = OnMalformed::Skip;

        let settings = Settings::resolve(&cli, config);
        assert_eq!(settings.db_path, PathBuf::from("warehouse.db"));
        assert_eq!(settings.options.on_malformed, OnMalformed::Skip);
        assert_eq!(cli.stage, Stage::Songs);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let result = Cli::try_parse_from(["songplay-etl", "--stage", "artists"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_end_to_end_in_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let songs = dir.path().join("songs/A");
        std::fs::create_dir_all(&songs).unwrap();
        std::fs::write(
            songs.join("TRAAAAW128F429D538.json"),
            r#"{"artist_id":"AR1","artist_latitude":null,"artist_longitude":null,"artist_location":"","artist_name":"Casual","song_id":"SO1","title":"I Didn't Mean To","duration":218.93179,"year":0}"#,
        )
        .unwrap();
        let db_path = dir.path().join("out.db");

        let cli = parse(&[
            "--config",
            dir.path().join("missing.toml").to_str().unwrap(),
            "--db",
            db_path.to_str().unwrap(),
            "--song-data",
            dir.path().join("songs").to_str().unwrap(),
            "--log-data",
            dir.path().join("logs").to_str().unwrap(),
            "--quiet",
        ]);
        run(&cli).unwrap();

        let conn = rusqlite::Connection::open(&db_path).unwrap();
        let songs: i64 = conn
            .query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(songs, 1);
    }
}
