use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Cumulative cases and deaths of one simulated epidemic, indexed by day.
///
/// Serializes as the pair `[cases, deaths]`. Both sequences have the same
/// length and never decrease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "(Vec<u64>, Vec<u64>)",
    into = "(Vec<u64>, Vec<u64>)"
)]
pub struct Trajectory {
    cases: Vec<u64>,
    deaths: Vec<u64>,
}

impl Trajectory {
    /// Prefix-sum daily incidence into a trajectory covering `days` days.
    pub fn from_incidence(new_cases: &[u64], new_deaths: &[u64], days: usize) -> Trajectory {
        Trajectory {
            cases: cumulative(&new_cases[..days]),
            deaths: cumulative(&new_deaths[..days]),
        }
    }

    pub fn cases(&self) -> &[u64] {
        &self.cases
    }

    pub fn deaths(&self) -> &[u64] {
        &self.deaths
    }

    /// Number of simulated days.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn final_deaths(&self) -> u64 {
        self.deaths.last().copied().unwrap_or(0)
    }
}

fn cumulative(incidence: &[u64]) -> Vec<u64> {
    incidence
        .iter()
        .scan(0u64, |total, n| {
            *total += n;
            Some(*total)
        })
        .collect()
}

fn is_non_decreasing(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

impl TryFrom<(Vec<u64>, Vec<u64>)> for Trajectory {
    type Error = ModelError;

    fn try_from((cases, deaths): (Vec<u64>, Vec<u64>)) -> Result<Self, Self::Error> {
        if cases.len() != deaths.len() {
            return Err(ModelError::InvalidTrajectory(format!(
                "{} case days but {} death days",
                cases.len(),
                deaths.len()
            )));
        }
        if !is_non_decreasing(&cases) || !is_non_decreasing(&deaths) {
            return Err(ModelError::InvalidTrajectory(
                "cumulative counts decrease".to_string(),
            ));
        }
        Ok(Trajectory { cases, deaths })
    }
}

impl From<Trajectory> for (Vec<u64>, Vec<u64>) {
    fn from(trajectory: Trajectory) -> Self {
        (trajectory.cases, trajectory.deaths)
    }
}
