use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
    branching::BranchingProcess,
    delay::DelayDistributions,
    error::ModelError,
    output::Trajectory,
    parameters::{LibrarySettings, validate_cfr, validate_r0},
};

/// On-disk shape of the library: R0 -> CFR -> trajectories, keyed by the
/// decimal text of each rate.
pub type NestedGrid = BTreeMap<String, BTreeMap<String, Vec<Trajectory>>>;

#[derive(Debug, Clone, PartialEq)]
struct Cell {
    cfr: f64,
    trajectories: Vec<Trajectory>,
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    r0: f64,
    cells: Vec<Cell>,
}

/// Simulated trajectories for every (R0, CFR) cell of a parameter grid.
///
/// Built once, then only read. Rows and cells are kept in ascending order so
/// that equal grids compare equal regardless of how they were assembled.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "NestedGrid")]
pub struct SimulationLibrary {
    rows: Vec<Row>,
}

impl SimulationLibrary {
    /// Simulate `trajectories_per_cell` runs for every combination of the
    /// configured R0 and CFR values.
    ///
    /// Each run gets its own generator seeded from a stream derived from
    /// `settings.seed`, so the result does not depend on thread scheduling.
    pub fn build(
        settings: &LibrarySettings,
        delays: &DelayDistributions,
    ) -> Result<SimulationLibrary, ModelError> {
        let r0_values = sorted_unique(&settings.r0_values);
        let cfr_values = sorted_unique(&settings.cfr_values);
        for r0 in &r0_values {
            validate_r0(*r0)?;
        }
        for cfr in &cfr_values {
            validate_cfr(*cfr)?;
        }

        let per_cell = settings.trajectories_per_cell;
        let mut seeder = StdRng::seed_from_u64(settings.seed);
        let mut jobs = Vec::with_capacity(r0_values.len() * cfr_values.len() * per_cell);
        for r0 in &r0_values {
            for cfr in &cfr_values {
                for _ in 0..per_cell {
                    jobs.push((settings.cell_parameters(*r0, *cfr), seeder.random::<u64>()));
                }
            }
        }
        tracing::info!(
            cells = r0_values.len() * cfr_values.len(),
            trajectories_per_cell = per_cell,
            max_days = settings.max_days,
            stop_threshold = settings.stop_threshold,
            "simulating library"
        );

        let trajectories: Vec<Trajectory> = jobs
            .into_par_iter()
            .map(|(parameters, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                BranchingProcess::simulate(&parameters, delays, &mut rng)
            })
            .collect::<Result<_, _>>()?;

        let mut trajectories = trajectories.into_iter();
        let mut cells = Vec::with_capacity(r0_values.len() * cfr_values.len());
        for r0 in &r0_values {
            for cfr in &cfr_values {
                let cell: Vec<Trajectory> = trajectories.by_ref().take(per_cell).collect();
                let stopped = cell
                    .iter()
                    .filter(|t| t.final_deaths() > settings.stop_threshold)
                    .count();
                tracing::info!(r0, cfr, stopped, "simulated cell");
                cells.push((*r0, *cfr, cell));
            }
        }
        SimulationLibrary::from_cells(cells)
    }

    /// Assemble a library from explicit cells. Each (R0, CFR) pair must be a
    /// valid parameter pair and may appear only once.
    pub fn from_cells(
        cells: impl IntoIterator<Item = (f64, f64, Vec<Trajectory>)>,
    ) -> Result<SimulationLibrary, ModelError> {
        let mut rows: Vec<Row> = Vec::new();
        for (r0, cfr, trajectories) in cells {
            validate_r0(r0)?;
            validate_cfr(cfr)?;
            let row = match rows.iter().position(|row| row.r0 == r0) {
                Some(index) => &mut rows[index],
                None => {
                    rows.push(Row {
                        r0,
                        cells: Vec::new(),
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            if row.cells.iter().any(|cell| cell.cfr == cfr) {
                return Err(ModelError::DuplicateGridCell { r0, cfr });
            }
            row.cells.push(Cell { cfr, trajectories });
        }
        rows.sort_by(|a, b| a.r0.total_cmp(&b.r0));
        for row in &mut rows {
            row.cells.sort_by(|a, b| a.cfr.total_cmp(&b.cfr));
        }
        Ok(SimulationLibrary { rows })
    }

    /// Trajectories simulated for exactly this (R0, CFR) pair.
    pub fn get(&self, r0: f64, cfr: f64) -> Result<&[Trajectory], ModelError> {
        self.rows
            .iter()
            .find(|row| row.r0 == r0)
            .and_then(|row| row.cells.iter().find(|cell| cell.cfr == cfr))
            .map(|cell| cell.trajectories.as_slice())
            .ok_or(ModelError::GridMiss { r0, cfr })
    }

    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, &[Trajectory])> + '_ {
        self.rows.iter().flat_map(|row| {
            row.cells
                .iter()
                .map(move |cell| (row.r0, cell.cfr, cell.trajectories.as_slice()))
        })
    }

    pub fn trajectory_count(&self) -> usize {
        self.cells().map(|(_, _, trajectories)| trajectories.len()).sum()
    }
}

fn sorted_unique(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

pub fn format_key(value: f64) -> String {
    value.to_string()
}

pub fn parse_key(key: &str) -> Result<f64, ModelError> {
    key.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ModelError::InvalidGridKey(key.to_string()))
}

impl Serialize for SimulationLibrary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for row in &self.rows {
            map.serialize_entry(&format_key(row.r0), row)?;
        }
        map.end()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for cell in &self.cells {
            map.serialize_entry(&format_key(cell.cfr), &cell.trajectories)?;
        }
        map.end()
    }
}

impl TryFrom<NestedGrid> for SimulationLibrary {
    type Error = ModelError;

    fn try_from(grid: NestedGrid) -> Result<Self, Self::Error> {
        let mut cells = Vec::new();
        for (r0_key, row) in grid {
            let r0 = parse_key(&r0_key)?;
            for (cfr_key, trajectories) in row {
                cells.push((r0, parse_key(&cfr_key)?, trajectories));
            }
        }
        SimulationLibrary::from_cells(cells)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delay::DelayParameters;

    fn small_settings(seed: u64) -> LibrarySettings {
        LibrarySettings {
            r0_values: vec![2.5, 2.0],
            cfr_values: vec![0.02, 0.01],
            trajectories_per_cell: 8,
            max_days: 60,
            stop_threshold: 200,
            seed,
        }
    }

    fn delays() -> DelayDistributions {
        DelayDistributions::new(&DelayParameters::default()).unwrap()
    }

    fn trajectory(cases: Vec<u64>, deaths: Vec<u64>) -> Trajectory {
        Trajectory::try_from((cases, deaths)).unwrap()
    }

    #[test]
    fn test_build_fills_every_cell() {
        let library = SimulationLibrary::build(&small_settings(1), &delays()).unwrap();
        let keys: Vec<(f64, f64)> = library.cells().map(|(r0, cfr, _)| (r0, cfr)).collect();
        assert_eq!(keys, vec![(2.0, 0.01), (2.0, 0.02), (2.5, 0.01), (2.5, 0.02)]);
        assert_eq!(library.trajectory_count(), 32);
        for r0 in [2.0, 2.5] {
            for cfr in [0.01, 0.02] {
                assert_eq!(library.get(r0, cfr).unwrap().len(), 8);
            }
        }
    }

    #[test]
    fn test_build_is_reproducible() {
        let a = SimulationLibrary::build(&small_settings(42), &delays()).unwrap();
        let b = SimulationLibrary::build(&small_settings(42), &delays()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_miss() {
        let library = SimulationLibrary::build(&small_settings(1), &delays()).unwrap();
        assert!(matches!(
            library.get(3.0, 0.02),
            Err(ModelError::GridMiss { r0, cfr }) if r0 == 3.0 && cfr == 0.02
        ));
        assert!(matches!(
            library.get(2.5, 0.03),
            Err(ModelError::GridMiss { .. })
        ));
    }

    #[test]
    fn test_build_rejects_invalid_cells() {
        let mut settings = small_settings(1);
        settings.cfr_values.push(0.0);
        assert!(matches!(
            SimulationLibrary::build(&settings, &delays()),
            Err(ModelError::InvalidParameter { name: "CFR", .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let library = SimulationLibrary::build(&small_settings(3), &delays()).unwrap();
        let json = serde_json::to_string(&library).unwrap();
        let back: SimulationLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, library);
    }

    #[test]
    fn test_nested_layout() {
        let library = SimulationLibrary::from_cells([
            (2.0, 0.005, vec![trajectory(vec![1, 3], vec![0, 1])]),
            (2.5, 0.02, vec![]),
        ])
        .unwrap();
        let value = serde_json::to_value(&library).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "2": { "0.005": [[[1, 3], [0, 1]]] },
                "2.5": { "0.02": [] }
            })
        );
    }

    #[test]
    fn test_reload_string_keys() {
        let raw = r#"{"2.0": {"0.01": [[[1, 2, 4], [0, 0, 1]]]}, "1.5": {"0.03": []}}"#;
        let library: SimulationLibrary = serde_json::from_str(raw).unwrap();
        let keys: Vec<(f64, f64)> = library.cells().map(|(r0, cfr, _)| (r0, cfr)).collect();
        assert_eq!(keys, vec![(1.5, 0.03), (2.0, 0.01)]);
        assert_eq!(library.get(2.0, 0.01).unwrap()[0].cases(), &[1, 2, 4]);
        assert!(library.get(1.5, 0.03).unwrap().is_empty());
    }

    #[test]
    fn test_reload_rejects_bad_keys() {
        let bad_key = r#"{"two": {"0.01": []}}"#;
        assert!(serde_json::from_str::<SimulationLibrary>(bad_key).is_err());

        let duplicate = r#"{"2": {"0.01": []}, "2.0": {"0.01": []}}"#;
        assert!(serde_json::from_str::<SimulationLibrary>(duplicate).is_err());
    }

    #[test]
    fn test_reload_rejects_invalid_rates() {
        for raw in [
            r#"{"-1": {"0.01": []}}"#,
            r#"{"0": {"0.01": []}}"#,
            r#"{"2": {"0": []}}"#,
            r#"{"2": {"1.5": []}}"#,
        ] {
            assert!(serde_json::from_str::<SimulationLibrary>(raw).is_err());
        }
        assert!(matches!(
            SimulationLibrary::from_cells([(2.0, 0.0, vec![])]),
            Err(ModelError::InvalidParameter { name: "CFR", .. })
        ));
    }

    #[test]
    fn test_key_format() {
        assert_eq!(format_key(2.0), "2");
        assert_eq!(format_key(2.5), "2.5");
        assert_eq!(format_key(0.005), "0.005");
        assert_eq!(parse_key("0.005").unwrap(), 0.005);
        assert!(parse_key("inf").is_err());
    }
}
