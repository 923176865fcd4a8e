//! Immutable description of one sweep.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    axis::{Axis, AxisMap},
    error::{Result, SweepError},
    measure::Parser,
    output::OutputMode,
};

pub const DEFAULT_MEASUREMENT_COLUMN: &str = "measurement";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub base_args: Vec<String>,
    #[serde(default)]
    pub env: AxisMap,
    #[serde(default)]
    pub flags: AxisMap,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    pub destination: PathBuf,
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default = "default_measurement_column")]
    pub measurement_column: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub abort_on_nonzero_exit: bool,
    #[serde(default)]
    pub record_failures: bool,
    #[serde(default)]
    pub parser: Parser,
}

fn default_repetitions() -> u32 {
    1
}

fn default_measurement_column() -> String {
    DEFAULT_MEASUREMENT_COLUMN.to_string()
}

impl SweepConfig {
    pub fn builder(program: impl Into<String>, destination: impl Into<PathBuf>) -> SweepBuilder {
        SweepBuilder::new(program.into(), destination.into())
    }

    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(SweepError::InvalidConfig("command is empty".into()));
        }
        if self.repetitions == 0 {
            return Err(SweepError::InvalidConfig(format!(
                "sweep `{}`: repetitions must be at least 1",
                self.name
            )));
        }
        if self.measurement_column.trim().is_empty() {
            return Err(SweepError::InvalidConfig("measurement column name is empty".into()));
        }
        self.env.validate()?;
        self.flags.validate()?;
        if let Some(axis) = self.env.axes().iter().find(|a| a.label.contains('=')) {
            return Err(SweepError::InvalidConfig(format!(
                "environment variable name `{}` contains `=`",
                axis.label
            )));
        }

        let mut seen = HashSet::new();
        for column in self.header() {
            if !seen.insert(column.clone()) {
                return Err(SweepError::InvalidConfig(format!(
                    "sweep `{}`: column `{column}` appears twice",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Environment columns, flag columns, then the measurement column.
    pub fn header(&self) -> Vec<String> {
        self.env
            .axes()
            .iter()
            .chain(self.flags.axes())
            .map(|a| a.column_name().to_string())
            .chain(std::iter::once(self.measurement_column.clone()))
            .collect()
    }

    pub fn combination_count(&self) -> usize {
        self.env.combination_count() * self.flags.combination_count()
    }

    pub fn invocation_count(&self) -> usize {
        self.combination_count() * self.repetitions as usize
    }

    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|&s| s > 0).map(Duration::from_secs)
    }
}

/// Builder for [`SweepConfig`]; axis errors surface from [`SweepBuilder::build`].
#[derive(Debug)]
pub struct SweepBuilder {
    config: SweepConfig,
    error: Option<SweepError>,
}

impl SweepBuilder {
    fn new(program: String, destination: PathBuf) -> Self {
        let name = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sweep".into());
        Self {
            config: SweepConfig {
                name,
                program,
                base_args: Vec::new(),
                env: AxisMap::new(),
                flags: AxisMap::new(),
                repetitions: default_repetitions(),
                verbose: false,
                working_dir: None,
                destination,
                mode: OutputMode::Overwrite,
                measurement_column: default_measurement_column(),
                timeout_secs: None,
                abort_on_nonzero_exit: false,
                record_failures: false,
                parser: Parser::default(),
            },
            error: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn base_arg(mut self, arg: impl Into<String>) -> Self {
        self.config.base_args.push(arg.into());
        self
    }

    pub fn env(mut self, axis: Axis) -> Self {
        if let Err(e) = self.config.env.push(axis) {
            self.error.get_or_insert(e);
        }
        self
    }

    pub fn flag(mut self, axis: Axis) -> Self {
        if let Err(e) = self.config.flags.push(axis) {
            self.error.get_or_insert(e);
        }
        self
    }

    pub fn env_axes(mut self, env: AxisMap) -> Self {
        self.config.env = env;
        self
    }

    pub fn flag_axes(mut self, flags: AxisMap) -> Self {
        self.config.flags = flags;
        self
    }

    pub fn repetitions(mut self, n: u32) -> Self {
        self.config.repetitions = n;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn measurement_column(mut self, column: impl Into<String>) -> Self {
        self.config.measurement_column = column.into();
        self
    }

    /// Per-run bound, kept in whole seconds: a fractional bound is rounded
    /// up, and `None` or a zero duration means unbounded.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout_secs = timeout
            .filter(|d| !d.is_zero())
            .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0));
        self
    }

    pub fn abort_on_nonzero_exit(mut self, abort: bool) -> Self {
        self.config.abort_on_nonzero_exit = abort;
        self
    }

    pub fn record_failures(mut self, record: bool) -> Self {
        self.config.record_failures = record;
        self
    }

    pub fn parser(mut self, parser: Parser) -> Self {
        self.config.parser = parser;
        self
    }

    pub fn build(self) -> Result<SweepConfig> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_follows_axis_order() {
        let cfg = SweepConfig::builder("./run", "out.csv")
            .env(Axis::from_legacy("OMP_NUM_THREADS=", [2, 4]))
            .flag(Axis::from_legacy("-ts ", [8, 16]))
            .repetitions(2)
            .build()
            .unwrap();
        assert_eq!(cfg.header(), vec!["OMP_NUM_THREADS", "ts", "measurement"]);
        assert_eq!(cfg.invocation_count(), 8);
        assert_eq!(cfg.name, "out");
    }

    #[test]
    fn test_builder_reports_first_axis_error() {
        let err = SweepConfig::builder("./run", "out.csv")
            .flag(Axis::new("-ts", [8]))
            .flag(Axis::new("-ts", [16]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SweepError::DuplicateAxis(_)));
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let err = SweepConfig::builder("./run", "out.csv").repetitions(0).build().unwrap_err();
        assert!(matches!(err, SweepError::InvalidConfig(_)));
    }

    #[test]
    fn test_colliding_columns_rejected() {
        let err = SweepConfig::builder("./run", "out.csv")
            .env(Axis::new("ts", [1]))
            .flag(Axis::new("-ts", [8]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SweepError::InvalidConfig(_)));
    }

    #[test]
    fn test_builder_timeout_zero_is_unbounded() {
        let build = |t| SweepConfig::builder("./run", "out.csv").timeout(t).build().unwrap();
        assert_eq!(build(Some(Duration::ZERO)).timeout(), None);
        assert_eq!(build(None).timeout_secs, None);
        assert_eq!(build(Some(Duration::from_millis(250))).timeout_secs, Some(1));
        assert_eq!(build(Some(Duration::from_millis(2500))).timeout_secs, Some(3));
        assert_eq!(build(Some(Duration::from_secs(4))).timeout_secs, Some(4));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "name": "rot",
            "program": "./run",
            "destination": "rotation.csv",
            "flags": [{"label": "--size", "values": ["512", "1024"], "style": "joined"}]
        }"#;
        let cfg: SweepConfig = serde_json::from_str(json).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.repetitions, 1);
        assert_eq!(cfg.mode, OutputMode::Overwrite);
        assert_eq!(cfg.parser, Parser::LastNumber);
        assert_eq!(cfg.header(), vec!["size", "measurement"]);
        assert_eq!(cfg.working_dir(), Path::new("."));
    }
}
