//! Estimates how many infections lie behind an observed death count.
//!
//! A library of branching-process epidemics is simulated over a grid of
//! reproduction numbers and fatality ratios. For an observed number of deaths,
//! the case counts of simulated epidemics at the moment they reached that many
//! deaths form a sample of plausible infection counts, summarized into
//! nearest-rank intervals.

pub mod aggregate;
pub mod branching;
pub mod cache;
pub mod delay;
pub mod error;
pub mod inference;
pub mod library;
pub mod output;
pub mod parameters;
pub mod population;
pub mod report;

pub use aggregate::{IntervalSummary, ObservedCounts, Percentiles, summarize};
pub use branching::BranchingProcess;
pub use delay::{DelayDistributions, DelayParameters};
pub use error::{AppError, ModelError};
pub use inference::InferenceEngine;
pub use library::SimulationLibrary;
pub use output::Trajectory;
pub use parameters::{LibrarySettings, Parameters, RunInput};
