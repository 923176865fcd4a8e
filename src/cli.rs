use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "sweeprun", about = "Parameter sweeps over an external benchmark program", version)]
#[command(group(ArgGroup::new("verbosity").args(["verbose", "quiet"]).multiple(false)))]
#[command(group(ArgGroup::new("nonzero").args(["abort_on_nonzero", "continue_on_nonzero"]).multiple(false)))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print the invocations of each sweep without running them.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Echo every run and its measurement, overriding the sweep's own setting.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
    /// Never echo runs.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Kill a run after this many seconds (0 disables the bound).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Directory for result files with relative destinations.
    #[arg(long = "output-dir", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Working directory for the benchmark program, overriding the sweep's own.
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Stop the sweep when a run exits with a non-zero status.
    #[arg(long = "abort-on-nonzero", global = true)]
    pub abort_on_nonzero: bool,
    /// Keep going after non-zero exits (default).
    #[arg(long = "continue-on-nonzero", global = true)]
    pub continue_on_nonzero: bool,

    /// Write an NA row for failed runs instead of omitting them.
    #[arg(long = "record-failures", global = true)]
    pub record_failures: bool,

    /// Measurement parser: last, exact or after:<marker>.
    #[arg(long, global = true)]
    pub parser: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one or more built-in drivers.
    Run {
        #[arg(value_name = "DRIVER", required = true)]
        drivers: Vec<String>,
        /// Include sweeps that are defined but disabled by default.
        #[arg(long)]
        all: bool,
    },
    /// Run the sweeps in a JSON plan file.
    Plan {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List built-in drivers.
    List,
    /// Write an example plan file.
    Init {
        #[arg(value_name = "FILE", default_value = "sweep-plan.json")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
