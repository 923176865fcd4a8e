//! Parameter sweeps over an external benchmark executable.
//!
//! A sweep enumerates the Cartesian product of environment-variable axes and
//! command-line flag axes, runs the target program once per combination and
//! repetition, and appends one CSV row per run.

pub mod axis;
pub mod command;
pub mod config;
pub mod drivers;
pub mod error;
pub mod execution;
pub mod logging;
pub mod measure;
pub mod output;
pub mod plan;
pub mod printer;
pub mod sweep;

use std::path::Path;

pub use axis::{ArgStyle, Axis, AxisMap, Combination, Combinations};
pub use error::{Result, SweepError};
pub use execution::{RunFailure, SweepReport, SweepRunner};
pub use measure::{MeasurementParser, Parser};
pub use output::OutputMode;
pub use sweep::{SweepBuilder, SweepConfig};

/// One-call sweep: every combination of `env_axes` × `flag_axes`, each run
/// `repetitions` times, rows written to `destination` (overwritten).
pub async fn execute(
    command: &str,
    env_axes: AxisMap,
    flag_axes: AxisMap,
    repetitions: u32,
    verbose: bool,
    working_dir: Option<&Path>,
    destination: &Path,
) -> Result<SweepReport> {
    let mut builder = SweepConfig::builder(command, destination)
        .env_axes(env_axes)
        .flag_axes(flag_axes)
        .repetitions(repetitions)
        .verbose(verbose);
    if let Some(dir) = working_dir {
        builder = builder.working_dir(dir);
    }
    SweepRunner::new(builder.build()?)?.run().await
}
