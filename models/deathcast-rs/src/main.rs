use std::fs;
use std::path::Path;
use std::process::ExitCode;

use deathcast::{
    AppError, InferenceEngine, RunInput, aggregate::CSV_HEADERS, cache, population::population,
    report::{ReportBuilder, Scenario},
};
use deathcast_runner::{
    Environment, RunnerError,
    observations::{FileSource, HttpSource, ObservationSource, load_latest},
    report::render_template,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing_subscriber::EnvFilter;

// Keeps the tie-break stream apart from the library's seed stream.
const INFERENCE_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), AppError> {
    // A TOML run document may be passed as the only argument; otherwise JSON on stdin
    let env = match std::env::args_os().nth(1) {
        Some(path) => Environment::from_toml_file(Path::new(&path))?,
        None => Environment::from_stdin()?,
    };
    let ctx = env.with_input_type::<RunInput>()?;
    let input = ctx.input.as_ref().ok_or(AppError::MissingInput)?;

    let settings = input.library_settings(ctx.seed);
    let library = cache::load_or_build(ctx.file("simulations"), &settings, &input.delays)?;

    let source: Box<dyn ObservationSource> = match ctx.file("observations") {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(input.observation_url.as_str())),
    };
    let (mut observations, as_of) = load_latest(source.as_ref())?;
    for observation in observations.values_mut() {
        observation.population = population(&observation.region);
        if observation.population.is_none() {
            tracing::warn!(region = %observation.region, "no population; skipped per capita");
        }
    }

    let engine =
        InferenceEngine::new(&library).with_marginal_grid(&input.r0_values, &input.cfr_values);
    let builder = ReportBuilder::new(
        &engine,
        &input.r0_values,
        &input.cfr_values,
        input.per_capita_scale,
    );
    let mut rng = StdRng::seed_from_u64(ctx.seed ^ ctx.replicate.rotate_left(32) ^ INFERENCE_STREAM);
    let report = builder.build(&observations, &mut rng)?;

    match ctx.file("template") {
        Some(path) => {
            let template = fs::read_to_string(path).map_err(|source| RunnerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let page = render_template(&template, &report, as_of)?;
            ctx.write("index.md", page.as_bytes())?;
        }
        None => {
            let stats = serde_json::to_vec(&report).map_err(RunnerError::from)?;
            ctx.write("stats.json", &stats)?;
        }
    }

    let marginal = Scenario {
        r0: None,
        cfr: None,
        per_capita: false,
    };
    let rows: Vec<Vec<String>> = report
        .get(&marginal.key())
        .map(|stats| stats.iter().map(|(_, summary)| summary.csv_row()).collect())
        .unwrap_or_default();
    ctx.write_csv("intervals.csv", &CSV_HEADERS, &rows)?;
    Ok(())
}
