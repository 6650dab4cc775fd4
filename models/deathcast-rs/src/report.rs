use std::collections::BTreeMap;

use deathcast_runner::observations::Observation;
use rand::Rng;

use crate::{
    aggregate::{IntervalSummary, ObservedCounts, summarize},
    error::ModelError,
    inference::InferenceEngine,
};

/// One view of the report: R0 and CFR fixed or pooled, counts absolute or
/// per capita.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub r0: Option<f64>,
    pub cfr: Option<f64>,
    pub per_capita: bool,
}

impl Scenario {
    /// Key used by the report page, e.g. `None,None,False` or `2.5,0.02,True`.
    pub fn key(&self) -> String {
        fn rate(value: Option<f64>) -> String {
            value.map_or_else(|| "None".to_string(), |v| v.to_string())
        }
        let per_capita = if self.per_capita { "True" } else { "False" };
        format!("{},{},{}", rate(self.r0), rate(self.cfr), per_capita)
    }

    fn is_marginal(&self) -> bool {
        self.r0.is_none() && self.cfr.is_none()
    }
}

/// Region summaries of one scenario, in display order.
pub type RegionStats = Vec<(String, IntervalSummary)>;

pub type Report = BTreeMap<String, RegionStats>;

impl From<&Observation> for ObservedCounts {
    fn from(observation: &Observation) -> Self {
        ObservedCounts {
            positive: observation.positive,
            negative: observation.negative,
            deaths: observation.deaths,
        }
    }
}

pub struct ReportBuilder<'a> {
    engine: &'a InferenceEngine<'a>,
    r0_values: Vec<f64>,
    cfr_values: Vec<f64>,
    per_capita_scale: f64,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        engine: &'a InferenceEngine<'a>,
        r0_values: &[f64],
        cfr_values: &[f64],
        per_capita_scale: f64,
    ) -> Self {
        ReportBuilder {
            engine,
            r0_values: r0_values.to_vec(),
            cfr_values: cfr_values.to_vec(),
            per_capita_scale,
        }
    }

    /// Summaries for every scenario. The pooled scenario is ranked by
    /// descending median; every other scenario keeps that ranking.
    ///
    /// Regions without positive tests are reported as raw counts. Regions
    /// without a population are left out of the per-capita scenarios.
    pub fn build<R: Rng + ?Sized>(
        &self,
        observations: &BTreeMap<String, Observation>,
        rng: &mut R,
    ) -> Result<Report, ModelError> {
        let r0_axis: Vec<Option<f64>> = std::iter::once(None)
            .chain(self.r0_values.iter().copied().map(Some))
            .collect();
        let cfr_axis: Vec<Option<f64>> = std::iter::once(None)
            .chain(self.cfr_values.iter().copied().map(Some))
            .collect();

        let mut report = Report::new();
        let mut ranking: [Vec<String>; 2] = Default::default();
        for r0 in &r0_axis {
            for cfr in &cfr_axis {
                let samples = self.draw(observations, *r0, *cfr, rng)?;
                for per_capita in [false, true] {
                    let scenario = Scenario {
                        r0: *r0,
                        cfr: *cfr,
                        per_capita,
                    };
                    let mut stats = self.summarize_all(observations, &samples, per_capita);
                    let order = &mut ranking[per_capita as usize];
                    if scenario.is_marginal() {
                        stats.sort_by(|(a_region, a), (b_region, b)| {
                            let a_median = a.median().unwrap_or(0.0);
                            let b_median = b.median().unwrap_or(0.0);
                            b_median
                                .total_cmp(&a_median)
                                .then_with(|| a_region.cmp(b_region))
                        });
                        *order = stats.iter().map(|(region, _)| region.clone()).collect();
                        if !per_capita {
                            log_intervals(&stats);
                        }
                    } else {
                        stats.sort_by_key(|(region, _)| {
                            order.iter().position(|r| r == region).unwrap_or(usize::MAX)
                        });
                    }
                    report.insert(scenario.key(), stats);
                }
            }
        }
        Ok(report)
    }

    fn draw<R: Rng + ?Sized>(
        &self,
        observations: &BTreeMap<String, Observation>,
        r0: Option<f64>,
        cfr: Option<f64>,
        rng: &mut R,
    ) -> Result<BTreeMap<String, Vec<u64>>, ModelError> {
        let mut samples = BTreeMap::new();
        for (region, observation) in observations {
            if observation.positive > 0 {
                let drawn = self.engine.infer(observation.deaths, r0, cfr, rng)?;
                samples.insert(region.clone(), drawn);
            }
        }
        Ok(samples)
    }

    fn summarize_all(
        &self,
        observations: &BTreeMap<String, Observation>,
        samples: &BTreeMap<String, Vec<u64>>,
        per_capita: bool,
    ) -> RegionStats {
        let mut stats = Vec::with_capacity(observations.len());
        for (region, observation) in observations {
            let normalizer = if per_capita {
                match observation.population {
                    Some(population) => population as f64 / self.per_capita_scale,
                    None => continue,
                }
            } else {
                1.0
            };
            let counts = ObservedCounts::from(observation);
            let summary = match samples.get(region) {
                Some(drawn) => summarize(region, drawn.clone(), &counts, normalizer),
                None => IntervalSummary::raw(region, &counts, normalizer),
            };
            stats.push((region.clone(), summary));
        }
        stats
    }
}

fn log_intervals(stats: &RegionStats) {
    for (region, summary) in stats {
        if let Some(p) = &summary.interval {
            tracing::info!(
                region = %region,
                lower95 = p.lower95,
                lower50 = p.lower50,
                median = p.median,
                upper50 = p.upper50,
                upper95 = p.upper95,
                "inferred infections"
            );
        }
    }
}

#[cfg(test)]
mod test {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{library::SimulationLibrary, output::Trajectory};

    fn observation(region: &str, positive: u64, deaths: u64, population: Option<u64>) -> Observation {
        Observation {
            region: region.to_string(),
            date: 20200321,
            positive,
            negative: 10,
            deaths,
            population,
        }
    }

    fn library() -> SimulationLibrary {
        let t1 = Trajectory::try_from((vec![1, 10, 50, 200], vec![0, 1, 2, 5])).unwrap();
        let t2 = Trajectory::try_from((vec![1, 20, 80], vec![0, 0, 1])).unwrap();
        SimulationLibrary::from_cells([(2.0, 0.1, vec![t1, t2])]).unwrap()
    }

    fn observations() -> BTreeMap<String, Observation> {
        [
            observation("NY", 5, 1, Some(200_000)),
            observation("WA", 1, 1, None),
            observation("CA", 1, 2, Some(400_000)),
            observation("AK", 0, 0, None),
            observation("WY", 3, 100, Some(100_000)),
        ]
        .into_iter()
        .map(|o| (o.region.clone(), o))
        .collect()
    }

    fn regions(stats: &RegionStats) -> Vec<&str> {
        stats.iter().map(|(region, _)| region.as_str()).collect()
    }

    #[test]
    fn test_scenario_keys() {
        let scenario = Scenario {
            r0: None,
            cfr: None,
            per_capita: false,
        };
        assert_eq!(scenario.key(), "None,None,False");
        let scenario = Scenario {
            r0: Some(2.0),
            cfr: Some(0.005),
            per_capita: true,
        };
        assert_eq!(scenario.key(), "2,0.005,True");
    }

    #[test]
    fn test_report_scenarios_and_ordering() {
        let library = library();
        let engine = InferenceEngine::new(&library).with_marginal_grid(&[2.0], &[0.1]);
        let builder = ReportBuilder::new(&engine, &[2.0], &[0.1], 100_000.0);
        let mut rng = StdRng::seed_from_u64(0);
        let report = builder.build(&observations(), &mut rng).unwrap();

        assert_eq!(report.len(), 8);
        let marginal = &report["None,None,False"];
        assert_eq!(regions(marginal), vec!["NY", "WA", "CA", "AK", "WY"]);
        assert_eq!(marginal[0].1.median(), Some(80.0));
        assert_eq!(marginal[2].1.median(), Some(50.0));
        // No positives: raw counts only
        assert_eq!(marginal[3].1.interval, None);
        // Deaths beyond every trajectory: raw counts only
        assert_eq!(marginal[4].1.interval, None);

        let per_capita = &report["None,None,True"];
        assert_eq!(regions(per_capita), vec!["NY", "CA", "WY"]);
        assert_eq!(per_capita[0].1.median(), Some(40.0));
        assert_eq!(per_capita[1].1.median(), Some(12.5));
        assert_eq!(per_capita[0].1.positive, 2.5);

        let fixed = &report["2,0.1,False"];
        assert_eq!(regions(fixed), regions(marginal));
        assert_eq!(regions(&report["2,None,True"]), regions(per_capita));
    }

    #[test]
    fn test_report_grid_miss() {
        let library = library();
        let engine = InferenceEngine::new(&library).with_marginal_grid(&[2.0], &[0.1]);
        let builder = ReportBuilder::new(&engine, &[2.0, 3.0], &[0.1], 100_000.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            builder.build(&observations(), &mut rng),
            Err(ModelError::GridMiss { .. })
        ));
    }
}
