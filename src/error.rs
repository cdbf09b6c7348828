use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a file (or the whole run) from loading.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Input JSON is missing a required field or is not shaped as expected.
    #[error("malformed record in {}{}: {reason}", .path.display(), location(.line, .field))]
    MalformedRecord {
        path: PathBuf,
        line: Option<usize>,
        field: Option<String>,
        reason: String,
    },

    /// The database rejected a statement or the connection failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EtlError::MalformedRecord {
            path: path.into(),
            line: None,
            field: None,
            reason: reason.into(),
        }
    }

    /// A required field is absent (or unusable) on the given 1-based line.
    pub fn missing_field(path: impl Into<PathBuf>, line: usize, field: &str) -> Self {
        EtlError::MalformedRecord {
            path: path.into(),
            line: Some(line),
            field: Some(field.to_string()),
            reason: format!("missing required field `{field}`"),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, EtlError::MalformedRecord { .. })
    }
}

fn location(line: &Option<usize>, field: &Option<String>) -> String {
    match (line, field) {
        (Some(l), Some(f)) => format!(" (line {l}, field {f})"),
        (Some(l), None) => format!(" (line {l})"),
        (None, Some(f)) => format!(" (field {f})"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_path_line_and_field() {
        let err = EtlError::missing_field("/data/log.json", 3, "ts");
        assert_eq!(
            err.to_string(),
            "malformed record in /data/log.json (line 3, field ts): missing required field `ts`"
        );
        assert!(err.is_malformed());
    }

    #[test]
    fn storage_error_is_not_malformed() {
        let err = EtlError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_malformed());
        assert!(err.to_string().starts_with("storage error"));
    }
}
