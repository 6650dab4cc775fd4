use deathcast_runner::RunnerError;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("no simulations for R0={r0} CFR={cfr}")]
    GridMiss { r0: f64, cfr: f64 },

    #[error("invalid delay distribution: {0}")]
    InvalidDelay(String),

    #[error("sampling failed: {0}")]
    Sampling(String),

    #[error("invalid grid key '{0}'")]
    InvalidGridKey(String),

    #[error("grid cell R0={r0} CFR={cfr} appears more than once")]
    DuplicateGridCell { r0: f64, cfr: f64 },

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
}

/// Errors surfaced by a full model run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("simulation cache {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt simulation cache {path}: {source}")]
    CorruptCache {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model input was not loaded")]
    MissingInput,
}
