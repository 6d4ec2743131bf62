use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the tool itself (as opposed to a single run attempt)
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid marker table in {path}: {message}")]
    MarkerConfig { path: PathBuf, message: String },

    #[error("no log file given and LOCALAPPDATA is not set; pass the path to EE.log explicitly")]
    NoDefaultLog,

    #[error("report server failed: {0}")]
    Server(#[source] std::io::Error),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A recognised marker line whose payload could not be decoded.
///
/// Downstream timestamp arithmetic cannot proceed without the payload, so the
/// whole run attempt is abandoned when one of these is hit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("line has no leading timestamp: {line:?}")]
    MalformedTimestamp { line: String },

    #[error("state change carries no numeric state id: {line:?}")]
    MalformedState { line: String },
}
