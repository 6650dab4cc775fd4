use std::path::PathBuf;

/// Failures at the boundary of a model run: reading the run document,
/// fetching observations, and writing outputs.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("no input on stdin")]
    EmptyInput,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("no observations available from {0}")]
    NoObservations(String),
}
