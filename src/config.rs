use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from etl.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub input: InputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    /// File extension (without the dot) that marks an input file.
    pub extension: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub on_malformed: OnMalformed,
}

/// What to do with a file whose records fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnMalformed {
    /// Stop the run at the first malformed file.
    #[default]
    Abort,
    /// Roll the file back, log it, and continue with the next one.
    Skip,
}

impl EtlConfig {
    /// Load config from `path`. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(EtlError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        Self::parse(&contents).map_err(|reason| EtlError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(contents: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.message().to_string())?;
        if config.input.extension.is_empty() || config.input.extension.starts_with('.') {
            return Err(format!(
                "input.extension must be a bare extension like \"json\", got {:?}",
                config.input.extension
            ));
        }
        Ok(config)
    }
}

// --- Default implementations ---

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("songplays.db"),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            song_data: PathBuf::from("data/song_data"),
            log_data: PathBuf::from("data/log_data"),
            extension: "json".to_string(),
        }
    }
}
