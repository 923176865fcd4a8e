use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::{error::Result, measure::Parser, sweep::SweepConfig};

/// Runner defaults: built-in values, overlaid by `.sweeprc`, overlaid by `SWEEP_*` env vars.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

/// Command-line settings that take precedence over config and sweep values.
/// `None` leaves the decision to the layers below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub verbose: Option<bool>,
    /// `Some(0)` removes the bound.
    pub timeout_secs: Option<u64>,
    pub abort_on_nonzero: Option<bool>,
    pub record_failures: bool,
    pub parser: Option<Parser>,
    pub working_dir: Option<PathBuf>,
}

impl Config {
    /// Built-in defaults only; no file, no environment.
    pub fn with_defaults() -> Self {
        Self {
            inner: default_map(),
            config_path: default_config_path(),
        }
    }

    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(std::io::Result::ok) {
                    if let Some((k, v)) = parse_line(&line) {
                        map.insert(k, v);
                    }
                }
            }
        }

        // Environment takes precedence over the file
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// `SWEEP_TIMEOUT` in seconds; `0` or unset means no bound.
    pub fn timeout(&self) -> Option<Duration> {
        self.get_u64("SWEEP_TIMEOUT")
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.get("SWEEP_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_level(&self) -> String {
        self.get("SWEEP_LOG_LEVEL").unwrap_or_else(|| "warn".into())
    }

    /// Layers `overrides`, then this config, over the sweep's own settings.
    pub fn apply(&self, mut sweep: SweepConfig, overrides: &Overrides) -> Result<SweepConfig> {
        match overrides.verbose {
            Some(v) => sweep.verbose = v,
            None if self.get_bool("SWEEP_VERBOSE") => sweep.verbose = true,
            None => {}
        }

        match overrides.timeout_secs {
            Some(secs) => sweep.timeout_secs = (secs > 0).then_some(secs),
            None => {
                if let Some(limit) = self.timeout() {
                    sweep.timeout_secs = Some(limit.as_secs());
                }
            }
        }

        match overrides.abort_on_nonzero {
            Some(abort) => sweep.abort_on_nonzero_exit = abort,
            None if self.get_bool("SWEEP_ABORT_ON_NONZERO") => sweep.abort_on_nonzero_exit = true,
            None => {}
        }

        if overrides.record_failures || self.get_bool("SWEEP_RECORD_FAILURES") {
            sweep.record_failures = true;
        }

        if let Some(parser) = &overrides.parser {
            sweep.parser = parser.clone();
        }
        if let Some(dir) = &overrides.working_dir {
            sweep.working_dir = Some(dir.clone());
        }

        sweep.validate()?;
        Ok(sweep)
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (k, v) = line.split_once('=')?;
    Some((k.trim().to_string(), v.trim().to_string()))
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("SWEEP_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("sweeprun").join(".sweeprc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("SWEEP_TIMEOUT".into(), "0".into());
    m.insert("SWEEP_OUTPUT_DIR".into(), ".".into());
    m.insert("SWEEP_LOG_LEVEL".into(), "warn".into());

    // Bools as strings
    m.insert("SWEEP_ABORT_ON_NONZERO".into(), "false".into());
    m.insert("SWEEP_RECORD_FAILURES".into(), "false".into());
    m.insert("SWEEP_VERBOSE".into(), "false".into());
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_skips_comments_and_blank() {
        assert_eq!(parse_line("# SWEEP_TIMEOUT=3"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("no separator"), None);
        assert_eq!(
            parse_line(" SWEEP_TIMEOUT = 30 "),
            Some(("SWEEP_TIMEOUT".to_string(), "30".to_string()))
        );
    }

    #[test]
    fn test_file_values_overlay_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sweeprc");
        fs::write(&path, "SWEEP_RECORD_FAILURES=true\nSWEEP_OUTPUT_DIR=/tmp/results\n").unwrap();

        let cfg = Config::load_from(&path);
        // Env vars may override these on a developer machine.
        if env::var_os("SWEEP_RECORD_FAILURES").is_none() {
            assert!(cfg.get_bool("SWEEP_RECORD_FAILURES"));
        }
        if env::var_os("SWEEP_OUTPUT_DIR").is_none() {
            assert_eq!(cfg.output_dir(), PathBuf::from("/tmp/results"));
        }
    }

    fn sweep() -> SweepConfig {
        SweepConfig::builder("./run", "out.csv")
            .timeout(Some(Duration::from_secs(5)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_cli_verbosity_beats_config() {
        let mut cfg = Config::with_defaults();
        cfg.set("SWEEP_VERBOSE", "true");

        let quiet = Overrides {
            verbose: Some(false),
            ..Default::default()
        };
        assert!(!cfg.apply(sweep(), &quiet).unwrap().verbose);
        assert!(cfg.apply(sweep(), &Overrides::default()).unwrap().verbose);

        let plain = Config::with_defaults();
        let mut own = sweep();
        own.verbose = true;
        assert!(plain.apply(own, &Overrides::default()).unwrap().verbose);
    }

    #[test]
    fn test_timeout_precedence() {
        let mut cfg = Config::with_defaults();
        assert_eq!(cfg.apply(sweep(), &Overrides::default()).unwrap().timeout_secs, Some(5));

        cfg.set("SWEEP_TIMEOUT", "30");
        assert_eq!(cfg.apply(sweep(), &Overrides::default()).unwrap().timeout_secs, Some(30));

        let cli = |secs| Overrides {
            timeout_secs: Some(secs),
            ..Default::default()
        };
        assert_eq!(cfg.apply(sweep(), &cli(7)).unwrap().timeout_secs, Some(7));
        assert_eq!(cfg.apply(sweep(), &cli(0)).unwrap().timeout(), None);
    }

    #[test]
    fn test_nonzero_policy_precedence() {
        let mut cfg = Config::with_defaults();
        assert!(!cfg.apply(sweep(), &Overrides::default()).unwrap().abort_on_nonzero_exit);

        cfg.set("SWEEP_ABORT_ON_NONZERO", "yes");
        assert!(cfg.apply(sweep(), &Overrides::default()).unwrap().abort_on_nonzero_exit);

        let keep_going = Overrides {
            abort_on_nonzero: Some(false),
            ..Default::default()
        };
        assert!(!cfg.apply(sweep(), &keep_going).unwrap().abort_on_nonzero_exit);
    }

    #[test]
    fn test_record_failures_from_either_layer() {
        let mut cfg = Config::with_defaults();
        let cli = Overrides {
            record_failures: true,
            ..Default::default()
        };
        assert!(cfg.apply(sweep(), &cli).unwrap().record_failures);
        assert!(!cfg.apply(sweep(), &Overrides::default()).unwrap().record_failures);
        cfg.set("SWEEP_RECORD_FAILURES", "1");
        assert!(cfg.apply(sweep(), &Overrides::default()).unwrap().record_failures);
    }

    #[test]
    fn test_parser_and_workdir_overrides() {
        let cfg = Config::with_defaults();
        let overrides = Overrides {
            parser: Some(Parser::After("completed after".into())),
            working_dir: Some(PathBuf::from("/opt/easypap")),
            ..Default::default()
        };
        let applied = cfg.apply(sweep(), &overrides).unwrap();
        assert_eq!(applied.parser, Parser::After("completed after".into()));
        assert_eq!(applied.working_dir(), Path::new("/opt/easypap"));

        let untouched = cfg.apply(sweep(), &Overrides::default()).unwrap();
        assert_eq!(untouched.parser, Parser::LastNumber);
        assert_eq!(untouched.working_dir, None);
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let mut cfg = Config::load_from(Path::new("/nonexistent/.sweeprc"));
        cfg.set("SWEEP_TIMEOUT", "0");
        assert_eq!(cfg.timeout(), None);
        cfg.set("SWEEP_TIMEOUT", "90");
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(90)));
    }
}
