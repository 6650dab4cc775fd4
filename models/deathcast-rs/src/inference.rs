use rand::Rng;

use crate::{
    error::ModelError,
    library::SimulationLibrary,
    output::Trajectory,
    parameters::{DEFAULT_CFR_VALUES, DEFAULT_R0_VALUES},
};

/// Draws plausible case counts for an observed death count by conditioning
/// simulated trajectories on that count.
///
/// For every trajectory in the selected cells, the case count is read off a
/// day whose cumulative deaths equal the observation (one such day chosen
/// uniformly at random when there are several), or else off the first day
/// the observation was exceeded. Trajectories that never reach the observed
/// deaths contribute nothing.
pub struct InferenceEngine<'a> {
    library: &'a SimulationLibrary,
    marginal_r0: Vec<f64>,
    marginal_cfr: Vec<f64>,
}

impl<'a> InferenceEngine<'a> {
    /// Marginalizes over the default 4x4 grid when R0 or CFR is not fixed.
    pub fn new(library: &'a SimulationLibrary) -> Self {
        InferenceEngine {
            library,
            marginal_r0: DEFAULT_R0_VALUES.to_vec(),
            marginal_cfr: DEFAULT_CFR_VALUES.to_vec(),
        }
    }

    pub fn with_marginal_grid(mut self, r0_values: &[f64], cfr_values: &[f64]) -> Self {
        self.marginal_r0 = r0_values.to_vec();
        self.marginal_cfr = cfr_values.to_vec();
        self
    }

    /// Sample set for `observed_deaths`, pooled over the chosen cells.
    ///
    /// `None` for R0 or CFR pools over the marginal values of that axis.
    /// Every selected cell must exist in the library; a missing one fails
    /// the whole query before any sampling. The tie-break among exact-match
    /// days is the only use of `rng`.
    pub fn infer<R: Rng + ?Sized>(
        &self,
        observed_deaths: u64,
        r0: Option<f64>,
        cfr: Option<f64>,
        rng: &mut R,
    ) -> Result<Vec<u64>, ModelError> {
        let r0_values = r0.map_or_else(|| self.marginal_r0.clone(), |r0| vec![r0]);
        let cfr_values = cfr.map_or_else(|| self.marginal_cfr.clone(), |cfr| vec![cfr]);

        let mut cells = Vec::with_capacity(r0_values.len() * cfr_values.len());
        for r0 in &r0_values {
            for cfr in &cfr_values {
                cells.push(self.library.get(*r0, *cfr)?);
            }
        }

        let samples: Vec<u64> = cells
            .into_iter()
            .flatten()
            .filter_map(|trajectory| sample_cases(trajectory, observed_deaths, rng))
            .collect();
        tracing::debug!(
            observed_deaths,
            ?r0,
            ?cfr,
            samples = samples.len(),
            "inferred case counts"
        );
        Ok(samples)
    }
}

/// First day on which cumulative deaths reach `observed`.
///
/// Relies on `deaths` being non-decreasing.
pub fn first_at_least(deaths: &[u64], observed: u64) -> Option<usize> {
    let index = deaths.partition_point(|d| *d < observed);
    (index < deaths.len()).then_some(index)
}

/// Case count on a day matching `observed` deaths, if the trajectory gets
/// there at all.
pub fn sample_cases<R: Rng + ?Sized>(
    trajectory: &Trajectory,
    observed: u64,
    rng: &mut R,
) -> Option<u64> {
    let deaths = trajectory.deaths();
    let first = first_at_least(deaths, observed)?;
    let day = if deaths[first] == observed {
        // Exact matches form one contiguous run of days
        let end = first + deaths[first..].partition_point(|d| *d == observed);
        if end - first > 1 {
            rng.random_range(first..end)
        } else {
            first
        }
    } else {
        first
    };
    Some(trajectory.cases()[day])
}
