use serde::{Deserialize, Serialize};

use crate::delay::DelayParameters;
use crate::error::ModelError;

pub const DEFAULT_R0_VALUES: [f64; 4] = [1.5, 2.0, 2.5, 3.0];
pub const DEFAULT_CFR_VALUES: [f64; 4] = [0.005, 0.01, 0.02, 0.03];
pub const DEFAULT_TRAJECTORIES_PER_CELL: usize = 500;
pub const DEFAULT_MAX_DAYS: usize = 100;
/// Runs stop once cumulative deaths exceed this; observed death counts above
/// it cannot be matched.
pub const DEFAULT_STOP_THRESHOLD: u64 = 200;
pub const DEFAULT_PER_CAPITA_SCALE: f64 = 100_000.0;

/// Inputs of a single branching-process run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub r0: f64,
    pub cfr: f64,
    pub max_days: usize,
    pub stop_threshold: u64,
}

impl Parameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_r0(self.r0)?;
        validate_cfr(self.cfr)
    }
}

pub fn validate_r0(r0: f64) -> Result<(), ModelError> {
    if r0.is_finite() && r0 > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter {
            name: "R0",
            value: r0,
            reason: "must be a positive number",
        })
    }
}

pub fn validate_cfr(cfr: f64) -> Result<(), ModelError> {
    if cfr > 0.0 && cfr <= 1.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter {
            name: "CFR",
            value: cfr,
            reason: "must lie in (0, 1]",
        })
    }
}

/// Shape of the simulation library: which cells to fill and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub r0_values: Vec<f64>,
    pub cfr_values: Vec<f64>,
    pub trajectories_per_cell: usize,
    pub max_days: usize,
    pub stop_threshold: u64,
    pub seed: u64,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings {
            r0_values: DEFAULT_R0_VALUES.to_vec(),
            cfr_values: DEFAULT_CFR_VALUES.to_vec(),
            trajectories_per_cell: DEFAULT_TRAJECTORIES_PER_CELL,
            max_days: DEFAULT_MAX_DAYS,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            seed: 0,
        }
    }
}

impl LibrarySettings {
    pub fn cell_parameters(&self, r0: f64, cfr: f64) -> Parameters {
        Parameters {
            r0,
            cfr,
            max_days: self.max_days,
            stop_threshold: self.stop_threshold,
        }
    }
}

/// The `input` section of a run document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunInput {
    pub r0_values: Vec<f64>,
    pub cfr_values: Vec<f64>,
    pub trajectories_per_cell: usize,
    pub max_days: usize,
    pub stop_threshold: u64,
    pub observation_url: String,
    pub delays: DelayParameters,
    pub per_capita_scale: f64,
}

impl Default for RunInput {
    fn default() -> Self {
        let library = LibrarySettings::default();
        RunInput {
            r0_values: library.r0_values,
            cfr_values: library.cfr_values,
            trajectories_per_cell: library.trajectories_per_cell,
            max_days: library.max_days,
            stop_threshold: library.stop_threshold,
            observation_url: deathcast_runner::observations::DEFAULT_URL.to_string(),
            delays: DelayParameters::default(),
            per_capita_scale: DEFAULT_PER_CAPITA_SCALE,
        }
    }
}

impl RunInput {
    pub fn library_settings(&self, seed: u64) -> LibrarySettings {
        LibrarySettings {
            r0_values: self.r0_values.clone(),
            cfr_values: self.cfr_values.clone(),
            trajectories_per_cell: self.trajectories_per_cell,
            max_days: self.max_days,
            stop_threshold: self.stop_threshold,
            seed,
        }
    }
}
