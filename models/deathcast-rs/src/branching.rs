use rand::{Rng, distr::Distribution};
use rand_distr::Poisson;

use crate::{
    delay::DelayDistributions, error::ModelError, output::Trajectory, parameters::Parameters,
};

/// Discrete-time branching process seeded with a single case on day 0.
///
/// Each day, the cases with onset on that day draw one serial interval each;
/// a Poisson(R0 * cases) number of secondary cases is spread over those
/// candidate days, picked uniformly with replacement. Deaths are placed the
/// same way from onset-to-death delays with a Poisson(CFR * cases) count.
///
/// Only days strictly after the current day and before `max_days` receive
/// events; anything else is dropped, so offspring and deaths are undercounted
/// close to the horizon. The run stops early once cumulative deaths exceed
/// `stop_threshold`.
///
/// The result is fully determined by the state of `rng`.
pub struct BranchingProcess {}

impl BranchingProcess {
    pub fn simulate<R: Rng + ?Sized>(
        parameters: &Parameters,
        delays: &DelayDistributions,
        rng: &mut R,
    ) -> Result<Trajectory, ModelError> {
        parameters.validate()?;

        let horizon = parameters.max_days;
        let mut new_cases = vec![0u64; horizon];
        let mut new_deaths = vec![0u64; horizon];
        if horizon == 0 {
            return Ok(Trajectory::from_incidence(&new_cases, &new_deaths, 0));
        }
        new_cases[0] = 1;

        let mut candidates: Vec<Option<usize>> = Vec::new();
        let mut cum_deaths = 0;
        let mut days = horizon;
        for step in 0..horizon {
            let cases = new_cases[step];
            if cases > 0 {
                // Secondary infections
                candidates.clear();
                candidates.extend(
                    (0..cases).map(|_| future_day(step, delays.serial_interval(rng), horizon)),
                );
                let infections = poisson(parameters.r0 * cases as f64, rng)?;
                scatter(&candidates, infections, &mut new_cases, rng);

                // Eventual deaths among today's cases
                candidates.clear();
                candidates.extend(
                    (0..cases).map(|_| future_day(step, delays.onset_to_death(rng), horizon)),
                );
                let deaths = poisson(parameters.cfr * cases as f64, rng)?;
                scatter(&candidates, deaths, &mut new_deaths, rng);
            }

            cum_deaths += new_deaths[step];
            if cum_deaths > parameters.stop_threshold {
                days = step + 1;
                break;
            }
        }

        Ok(Trajectory::from_incidence(&new_cases, &new_deaths, days))
    }
}

/// Day on which an event `delay` days after `step` lands, if it falls in
/// `(step, horizon)`.
fn future_day(step: usize, delay: f64, horizon: usize) -> Option<usize> {
    let day = (step as f64 + delay).round();
    if day > step as f64 && day < horizon as f64 {
        Some(day as usize)
    } else {
        None
    }
}

fn poisson<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> Result<u64, ModelError> {
    // Poisson requires a non-zero rate
    if rate <= 0.0 {
        return Ok(0);
    }
    let distribution =
        Poisson::new(rate).map_err(|e| ModelError::Sampling(format!("Poisson({rate}): {e}")))?;
    Ok(distribution.sample(rng) as u64)
}

/// Add `count` events to `bins`, each on a candidate day picked uniformly with
/// replacement. Picks that landed outside the window are lost.
fn scatter<R: Rng + ?Sized>(
    candidates: &[Option<usize>],
    count: u64,
    bins: &mut [u64],
    rng: &mut R,
) {
    if candidates.is_empty() {
        return;
    }
    for _ in 0..count {
        if let Some(day) = candidates[rng.random_range(0..candidates.len())] {
            bins[day] += 1;
        }
    }
}
