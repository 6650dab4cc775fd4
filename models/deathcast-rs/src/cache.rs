//! On-disk cache of the simulation library.
//!
//! The grid is stored as nested JSON next to a `.sha256` sidecar holding the
//! digest of the settings that produced it. A cache whose sidecar does not
//! match the current settings is rebuilt; a missing cache is simply built.

use std::ffi::OsString;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use deathcast_runner::digest::content_digest;
use serde::Serialize;

use crate::{
    delay::{DelayDistributions, DelayParameters},
    error::AppError,
    library::SimulationLibrary,
    parameters::LibrarySettings,
};

#[derive(Serialize)]
struct CacheKey<'a> {
    settings: &'a LibrarySettings,
    delays: &'a DelayParameters,
}

fn digest_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".sha256");
    PathBuf::from(name)
}

fn cache_error(path: &Path, source: std::io::Error) -> AppError {
    AppError::Cache {
        path: path.display().to_string(),
        source,
    }
}

/// Load the library cached at `path`, or simulate it (and cache it when a
/// path is given).
pub fn load_or_build(
    path: Option<&Path>,
    settings: &LibrarySettings,
    delay_parameters: &DelayParameters,
) -> Result<SimulationLibrary, AppError> {
    let delays = DelayDistributions::new(delay_parameters)?;
    let Some(path) = path else {
        return Ok(SimulationLibrary::build(settings, &delays)?);
    };

    let digest = content_digest(&CacheKey {
        settings,
        delays: delay_parameters,
    })?;

    if path.exists() {
        let stored = fs::read_to_string(digest_path(path)).ok();
        if stored.as_deref().map(str::trim) == Some(digest.as_str()) {
            let library = load(path)?;
            tracing::info!(
                path = %path.display(),
                trajectories = library.trajectory_count(),
                "loaded cached simulations"
            );
            return Ok(library);
        }
        tracing::warn!(
            path = %path.display(),
            "cached simulations were built with different settings; rebuilding"
        );
    } else {
        tracing::debug!(path = %path.display(), "no cached simulations");
    }

    let library = SimulationLibrary::build(settings, &delays)?;
    save(path, &library, &digest)?;
    Ok(library)
}

pub fn load(path: &Path) -> Result<SimulationLibrary, AppError> {
    let file = fs::File::open(path).map_err(|e| cache_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| AppError::CorruptCache {
        path: path.display().to_string(),
        source,
    })
}

pub fn save(path: &Path, library: &SimulationLibrary, digest: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| cache_error(parent, e))?;
    }
    let file = fs::File::create(path).map_err(|e| cache_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, library).map_err(|e| cache_error(path, e.into()))?;
    writer.flush().map_err(|e| cache_error(path, e))?;

    let sidecar = digest_path(path);
    fs::write(&sidecar, digest).map_err(|e| cache_error(&sidecar, e))?;
    tracing::info!(path = %path.display(), "saved simulations");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn settings(per_cell: usize) -> LibrarySettings {
        LibrarySettings {
            r0_values: vec![2.0],
            cfr_values: vec![0.02],
            trajectories_per_cell: per_cell,
            max_days: 40,
            stop_threshold: 200,
            seed: 17,
        }
    }

    #[test]
    fn test_cold_start_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("sims.json");
        let delays = DelayParameters::default();

        let built = load_or_build(Some(&path), &settings(6), &delays).unwrap();
        assert!(path.exists());
        assert!(digest_path(&path).exists());

        let reloaded = load_or_build(Some(&path), &settings(6), &delays).unwrap();
        assert_eq!(reloaded, built);
    }

    #[test]
    fn test_stale_cache_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sims.json");
        let delays = DelayParameters::default();

        load_or_build(Some(&path), &settings(6), &delays).unwrap();
        let rebuilt = load_or_build(Some(&path), &settings(3), &delays).unwrap();
        assert_eq!(rebuilt.trajectory_count(), 3);
        assert_eq!(load(&path).unwrap(), rebuilt);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sims.json");
        let delays = DelayParameters::default();

        load_or_build(Some(&path), &settings(2), &delays).unwrap();
        fs::write(&path, "{\"2\": {\"0.02\": [[[1, 0], [0, 0]]]}}").unwrap();
        assert!(matches!(
            load_or_build(Some(&path), &settings(2), &delays),
            Err(AppError::CorruptCache { .. })
        ));
    }

    #[test]
    fn test_without_path() {
        let library = load_or_build(None, &settings(4), &DelayParameters::default()).unwrap();
        assert_eq!(library.trajectory_count(), 4);
    }
}
