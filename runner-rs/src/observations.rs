//! Regional testing and death counts.
//!
//! Sources return the raw daily records; the model only ever looks at the
//! most recent record of each region, picked by [`latest_by_region`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::RunnerError;

pub const DEFAULT_URL: &str = "http://covidtracking.com/api/states/daily";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.3";

// The full daily history for every state is several megabytes.
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// One region-day as published by the data source. Counts may be absent or
/// null and are read as zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyRecord {
    pub state: String,
    /// Calendar date as `YYYYMMDD`.
    pub date: u32,
    #[serde(default)]
    pub positive: Option<u64>,
    #[serde(default)]
    pub negative: Option<u64>,
    #[serde(default)]
    pub death: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub region: String,
    pub date: u32,
    pub positive: u64,
    pub negative: u64,
    pub deaths: u64,
    pub population: Option<u64>,
}

impl From<&DailyRecord> for Observation {
    fn from(record: &DailyRecord) -> Self {
        Observation {
            region: record.state.clone(),
            date: record.date,
            positive: record.positive.unwrap_or(0),
            negative: record.negative.unwrap_or(0),
            deaths: record.death.unwrap_or(0),
            population: None,
        }
    }
}

pub trait ObservationSource {
    fn fetch(&self) -> Result<Vec<DailyRecord>, RunnerError>;

    /// Human readable origin, used in logs and errors.
    fn describe(&self) -> String;
}

pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ObservationSource for HttpSource {
    fn fetch(&self) -> Result<Vec<DailyRecord>, RunnerError> {
        tracing::info!(url = %self.url, "fetching observations");
        let mut response = ureq::get(&self.url)
            .header("User-Agent", USER_AGENT)
            .call()?;
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()?;
        parse_records(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ObservationSource for FileSource {
    fn fetch(&self) -> Result<Vec<DailyRecord>, RunnerError> {
        tracing::info!(path = %self.path.display(), "reading observations");
        let raw = fs::read_to_string(&self.path).map_err(|source| RunnerError::Read {
            path: self.path.clone(),
            source,
        })?;
        parse_records(&raw)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn parse_records(raw: &str) -> Result<Vec<DailyRecord>, RunnerError> {
    Ok(serde_json::from_str(raw)?)
}

/// Most recent record of each region, by date. When a region reports the
/// same date twice the later record wins.
pub fn latest_by_region(records: &[DailyRecord]) -> BTreeMap<String, Observation> {
    let mut latest: BTreeMap<String, &DailyRecord> = BTreeMap::new();
    for record in records {
        match latest.get(&record.state) {
            Some(current) if current.date > record.date => {}
            _ => {
                latest.insert(record.state.clone(), record);
            }
        }
    }
    latest
        .into_iter()
        .map(|(region, record)| (region, Observation::from(record)))
        .collect()
}

/// Fetch from `source` and reduce to the latest observation per region.
/// An empty feed is an error: there is nothing to infer from.
pub fn load_latest(
    source: &dyn ObservationSource,
) -> Result<(BTreeMap<String, Observation>, u32), RunnerError> {
    let records = source.fetch()?;
    let as_of = records
        .iter()
        .map(|r| r.date)
        .max()
        .ok_or_else(|| RunnerError::NoObservations(source.describe()))?;
    let latest = latest_by_region(&records);
    tracing::info!(regions = latest.len(), as_of, "loaded observations");
    Ok((latest, as_of))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEED: &str = r#"[
        {"state": "NY", "date": 20200320, "positive": 7102, "negative": 25325, "death": 35},
        {"state": "NY", "date": 20200321, "positive": 10356, "negative": 35081, "death": 44},
        {"state": "WA", "date": 20200321, "positive": 1793, "negative": null, "death": 94},
        {"state": "WA", "date": 20200319, "positive": 1187, "negative": 15918, "death": 66},
        {"state": "AK", "date": 20200321, "positive": 14}
    ]"#;

    #[test]
    fn test_parse_nullable_counts() {
        let records = parse_records(FEED).unwrap();
        assert_eq!(records.len(), 5);
        let alaska = Observation::from(&records[4]);
        assert_eq!(alaska.positive, 14);
        assert_eq!(alaska.negative, 0);
        assert_eq!(alaska.deaths, 0);
    }

    #[test]
    fn test_latest_by_date() {
        let records = parse_records(FEED).unwrap();
        let latest = latest_by_region(&records);
        assert_eq!(latest.len(), 3);
        assert_eq!(latest["NY"].date, 20200321);
        assert_eq!(latest["NY"].deaths, 44);
        // Out-of-order input still resolves to the newest date
        assert_eq!(latest["WA"].date, 20200321);
        assert_eq!(latest["WA"].positive, 1793);
        assert_eq!(latest["WA"].negative, 0);
    }

    #[test]
    fn test_latest_tie_takes_later_record() {
        let records = parse_records(
            r#"[
                {"state": "CA", "date": 20200321, "positive": 1, "death": 0},
                {"state": "CA", "date": 20200321, "positive": 2, "death": 1}
            ]"#,
        )
        .unwrap();
        assert_eq!(latest_by_region(&records)["CA"].positive, 2);
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FEED.as_bytes()).unwrap();
        let (latest, as_of) = load_latest(&FileSource::new(file.path())).unwrap();
        assert_eq!(as_of, 20200321);
        assert_eq!(latest["AK"].positive, 14);
    }

    #[test]
    fn test_empty_feed_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[]").unwrap();
        let result = load_latest(&FileSource::new(file.path()));
        assert!(matches!(result, Err(RunnerError::NoObservations(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = FileSource::new("/nonexistent/daily.json").fetch();
        assert!(matches!(result, Err(RunnerError::Read { .. })));
    }
}
