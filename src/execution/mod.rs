//! Sweep execution engine: enumerate, spawn, parse, record.

use std::{future::Future, path::PathBuf, time::Instant};

use owo_colors::OwoColorize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    axis::Combinations,
    command::{resolve_program, Invocation},
    error::{Result, SweepError},
    measure::MeasurementParser,
    output::{CsvSink, SENTINEL},
    printer::ProgressPrinter,
    sweep::SweepConfig,
};

/// A run that did not produce a row (or produced a sentinel row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub combination: String,
    pub repetition: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub name: String,
    pub destination: PathBuf,
    pub invocations: usize,
    pub rows_written: usize,
    pub failures: Vec<RunFailure>,
    pub interrupted: bool,
}

impl SweepReport {
    /// One line per failed run, for the console.
    pub fn failure_lines(&self, color: bool) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| {
                let combination = if color {
                    f.combination.yellow().to_string()
                } else {
                    f.combination.clone()
                };
                format!("  {} #{}: {}", combination, f.repetition, f.error)
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "{}: {} runs, {} rows -> {}",
            self.name,
            self.invocations,
            self.rows_written,
            self.destination.display()
        );
        if !self.failures.is_empty() {
            s.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.interrupted {
            s.push_str(" (interrupted)");
        }
        s
    }
}

pub struct SweepRunner {
    config: SweepConfig,
    parser: Box<dyn MeasurementParser>,
    printer: ProgressPrinter,
}

impl SweepRunner {
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let parser = Box::new(config.parser.clone());
        let printer = ProgressPrinter::new(config.verbose);
        Ok(Self {
            config,
            parser,
            printer,
        })
    }

    /// Replaces the configured parser with a caller-specific adapter.
    pub fn with_parser(mut self, parser: Box<dyn MeasurementParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Every distinct invocation in execution order, without running anything.
    ///
    /// A program that cannot be resolved yet is listed as written.
    pub fn invocations(&self) -> Result<Vec<Invocation>> {
        let cfg = &self.config;
        let working_dir = cfg.working_dir();
        let program = match resolve_program(&cfg.program, working_dir) {
            Ok(path) => path,
            Err(err) => {
                debug!(sweep = %cfg.name, "listing unresolved program: {err}");
                PathBuf::from(cfg.program.trim())
            }
        };
        Ok(Combinations::product(&cfg.env, &cfg.flags)
            .map(|combo| Invocation::build(&program, &cfg.base_args, &combo, working_dir))
            .collect())
    }

    /// Runs the sweep, stopping early on Ctrl-C.
    pub async fn run(&self) -> Result<SweepReport> {
        self.run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the sweep until it completes or `shutdown` resolves. On shutdown
    /// the running child is killed and rows written so far are kept.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<SweepReport>
    where
        F: Future<Output = ()>,
    {
        let cfg = &self.config;
        let working_dir = cfg.working_dir();
        let program = resolve_program(&cfg.program, working_dir)?;
        let mut sink = CsvSink::open(&cfg.destination, &cfg.header(), cfg.mode)?;

        let total = cfg.invocation_count();
        info!(
            sweep = %cfg.name,
            program = %program.display(),
            invocations = total,
            destination = %cfg.destination.display(),
            "starting sweep"
        );

        let mut report = SweepReport {
            name: cfg.name.clone(),
            destination: cfg.destination.clone(),
            ..Default::default()
        };
        tokio::pin!(shutdown);
        let mut index = 0;

        'sweep: for combo in Combinations::product(&cfg.env, &cfg.flags) {
            let invocation = Invocation::build(&program, &cfg.base_args, &combo, working_dir);
            let label = combo.to_string();

            for repetition in 1..=cfg.repetitions {
                index += 1;
                self.printer.start(index, total, repetition, &invocation);
                debug!(combination = %label, repetition, "running {}", invocation.display_line());

                let outcome = tokio::select! {
                    res = self.run_once(&invocation, &label) => Some(res),
                    _ = &mut shutdown => None,
                };
                let Some(outcome) = outcome else {
                    self.printer.interrupted();
                    warn!(sweep = %cfg.name, combination = %label, "sweep interrupted");
                    report.interrupted = true;
                    break 'sweep;
                };
                report.invocations += 1;

                match outcome {
                    Ok(value) => {
                        self.printer.measured(&value);
                        sink.write_row(combo.values().chain([value.as_str()]), &label)?;
                    }
                    Err(err @ SweepError::ChildProcessNonZeroExit { .. })
                        if cfg.abort_on_nonzero_exit =>
                    {
                        self.printer.failed(&err.to_string());
                        return Err(err);
                    }
                    Err(err) => {
                        self.printer.failed(&err.to_string());
                        if cfg.verbose {
                            warn!(sweep = %cfg.name, repetition, "{err}");
                        } else {
                            debug!(sweep = %cfg.name, repetition, "{err}");
                        }
                        if cfg.record_failures {
                            sink.write_row(combo.values().chain([SENTINEL]), &label)?;
                        }
                        report.failures.push(RunFailure {
                            combination: label.clone(),
                            repetition,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        report.rows_written = sink.rows_written();
        info!("{}", report.summary());
        Ok(report)
    }

    async fn run_once(&self, invocation: &Invocation, label: &str) -> Result<String> {
        let spawn_err = |source: std::io::Error| SweepError::Spawn {
            program: invocation.program.display().to_string(),
            combination: label.to_string(),
            source,
        };

        let started = Instant::now();
        let child = invocation.to_command().spawn().map_err(spawn_err)?;
        let _group = ProcessGroup(child.id());

        // Dropping the child on timeout or shutdown kills it (kill_on_drop);
        // `_group` then takes down anything it left behind.
        let output = match self.config.timeout() {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| SweepError::Timeout {
                    combination: label.to_string(),
                    seconds: limit.as_secs_f64(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(spawn_err)?;
        debug!(combination = %label, elapsed_ms = started.elapsed().as_millis() as u64, "child exited");

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(SweepError::ChildProcessNonZeroExit {
                combination: label.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        self.parser
            .parse(&stdout)
            .ok_or_else(|| SweepError::MalformedOutput {
                combination: label.to_string(),
                output: stdout.trim().chars().take(200).collect(),
            })
    }
}

/// Kills the child's process group when a run ends, however it ends.
struct ProcessGroup(Option<u32>);

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.0 {
                // SAFETY: killpg has no memory-safety preconditions; a group
                // that is already gone only yields ESRCH.
                unsafe {
                    libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
                }
            }
        }
    }
}
