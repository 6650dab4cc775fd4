use rand::{Rng, distr::Distribution};
use rand_distr::{Gamma, LogNormal};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Parameters of the two delay distributions, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayParameters {
    /// Mean of the log of the serial interval.
    pub serial_interval_mu: f64,
    /// Standard deviation of the log of the serial interval.
    pub serial_interval_sigma: f64,
    pub onset_to_death_shape: f64,
    pub onset_to_death_rate: f64,
}

impl Default for DelayParameters {
    fn default() -> Self {
        // Median serial interval ~4 days; mean onset-to-death ~15 days.
        DelayParameters {
            serial_interval_mu: 1.3868,
            serial_interval_sigma: 0.5680,
            onset_to_death_shape: 4.726,
            onset_to_death_rate: 0.3151,
        }
    }
}

/// Serial interval and onset-to-death delays, built once and shared by every
/// simulated trajectory.
#[derive(Debug, Clone)]
pub struct DelayDistributions {
    serial_interval: LogNormal<f64>,
    onset_to_death: Gamma<f64>,
}

impl DelayDistributions {
    pub fn new(parameters: &DelayParameters) -> Result<Self, ModelError> {
        require_positive("serial interval sigma", parameters.serial_interval_sigma)?;
        require_positive("onset-to-death shape", parameters.onset_to_death_shape)?;
        require_positive("onset-to-death rate", parameters.onset_to_death_rate)?;
        let serial_interval = LogNormal::new(
            parameters.serial_interval_mu,
            parameters.serial_interval_sigma,
        )
        .map_err(|e| ModelError::InvalidDelay(format!("serial interval: {e}")))?;
        let onset_to_death = Gamma::new(
            parameters.onset_to_death_shape,
            1.0 / parameters.onset_to_death_rate,
        )
        .map_err(|e| ModelError::InvalidDelay(format!("onset to death: {e}")))?;
        Ok(DelayDistributions {
            serial_interval,
            onset_to_death,
        })
    }

    pub fn serial_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.serial_interval.sample(rng)
    }

    pub fn onset_to_death<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.onset_to_death.sample(rng)
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidDelay(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod test {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn mean(samples: &[f64]) -> f64 {
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_default_delay_means() {
        let delays = DelayDistributions::new(&DelayParameters::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(8675309);
        let n = 200_000;
        let serial: Vec<f64> = (0..n).map(|_| delays.serial_interval(&mut rng)).collect();
        let death: Vec<f64> = (0..n).map(|_| delays.onset_to_death(&mut rng)).collect();

        // exp(mu + sigma^2 / 2)
        let serial_mean = f64::exp(1.3868 + 0.5680 * 0.5680 / 2.0);
        assert!(f64::abs(mean(&serial) - serial_mean) < 0.05);
        // shape / rate
        let death_mean = 4.726 / 0.3151;
        assert!(f64::abs(mean(&death) - death_mean) < 0.1);
        assert!(serial.iter().chain(death.iter()).all(|d| *d >= 0.0));
    }

    #[test]
    fn test_invalid_parameters() {
        for sigma in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let bad_sigma = DelayParameters {
                serial_interval_sigma: sigma,
                ..DelayParameters::default()
            };
            assert!(matches!(
                DelayDistributions::new(&bad_sigma),
                Err(ModelError::InvalidDelay(_))
            ));
        }

        let bad_rate = DelayParameters {
            onset_to_death_rate: 0.0,
            ..DelayParameters::default()
        };
        assert!(matches!(
            DelayDistributions::new(&bad_rate),
            Err(ModelError::InvalidDelay(_))
        ));

        for shape in [-2.0, 0.0, f64::NAN] {
            let bad_shape = DelayParameters {
                onset_to_death_shape: shape,
                ..DelayParameters::default()
            };
            assert!(matches!(
                DelayDistributions::new(&bad_shape),
                Err(ModelError::InvalidDelay(_))
            ));
        }
    }
}
