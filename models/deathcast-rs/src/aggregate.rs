use serde::Serialize;

/// Raw counts reported for a region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservedCounts {
    pub positive: u64,
    pub negative: u64,
    pub deaths: u64,
}

/// Nearest-rank percentiles of the inferred case counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentiles {
    pub lower95: f64,
    pub lower90: f64,
    pub lower50: f64,
    pub median: f64,
    pub upper50: f64,
    pub upper90: f64,
    pub upper95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalSummary {
    #[serde(skip)]
    pub region: String,
    pub positive: f64,
    pub negative: f64,
    pub deaths: f64,
    /// Absent when no sample reached the confirmed case count.
    #[serde(flatten)]
    pub interval: Option<Percentiles>,
}

pub const CSV_HEADERS: [&str; 11] = [
    "region", "positive", "negative", "deaths", "lower95", "lower90", "lower50", "median",
    "upper50", "upper90", "upper95",
];

impl IntervalSummary {
    /// Counts only, for regions where nothing was inferred.
    pub fn raw(region: &str, observed: &ObservedCounts, normalizer: f64) -> IntervalSummary {
        IntervalSummary {
            region: region.to_string(),
            positive: observed.positive as f64 / normalizer,
            negative: observed.negative as f64 / normalizer,
            deaths: observed.deaths as f64 / normalizer,
            interval: None,
        }
    }

    pub fn median(&self) -> Option<f64> {
        self.interval.map(|interval| interval.median)
    }

    pub fn csv_row(&self) -> Vec<String> {
        let mut row = vec![
            self.region.clone(),
            self.positive.to_string(),
            self.negative.to_string(),
            self.deaths.to_string(),
        ];
        match &self.interval {
            Some(p) => row.extend(
                [
                    p.lower95, p.lower90, p.lower50, p.median, p.upper50, p.upper90, p.upper95,
                ]
                .iter()
                .map(f64::to_string),
            ),
            None => row.extend(std::iter::repeat_n(String::new(), 7)),
        }
        row
    }
}

/// Samples that are at least the confirmed positive count, ascending.
/// True infections cannot be fewer than confirmed cases.
pub fn plausible_samples(mut samples: Vec<u64>, observed_positive: u64) -> Vec<u64> {
    samples.retain(|sample| *sample >= observed_positive);
    samples.sort_unstable();
    samples
}

/// Value at index `floor(len * fraction)` of an ascending, non-empty slice.
fn nearest_rank(sorted: &[u64], fraction: f64) -> u64 {
    let index = (sorted.len() as f64 * fraction) as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Interval summary of a sample set, with every value divided by
/// `normalizer` (1 for absolute counts).
pub fn summarize(
    region: &str,
    samples: Vec<u64>,
    observed: &ObservedCounts,
    normalizer: f64,
) -> IntervalSummary {
    let sorted = plausible_samples(samples, observed.positive);
    let mut summary = IntervalSummary::raw(region, observed, normalizer);
    if sorted.is_empty() {
        return summary;
    }
    let at = |fraction| nearest_rank(&sorted, fraction) as f64 / normalizer;
    summary.interval = Some(Percentiles {
        lower95: at(0.025),
        lower90: at(0.05),
        lower50: at(0.25),
        median: at(0.50),
        upper50: at(0.75),
        upper90: at(0.95),
        upper95: at(0.975),
    });
    summary
}
