//! Sweep plans: lists of sweeps stored as JSON.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{drivers, sweep::SweepConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub sweeps: Vec<SweepConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanFile {
    Wrapped(Plan),
    List(Vec<SweepConfig>),
    Single(Box<SweepConfig>),
}

impl Plan {
    /// Reads a plan file. Relative working directories are taken from the
    /// plan's own directory, relative destinations from `output_dir`.
    pub fn load(path: &Path, output_dir: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading plan file: {}", path.display()))?;
        let mut plan = Self::from_json(&text)
            .with_context(|| format!("parsing plan file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for sweep in &mut plan.sweeps {
            let dir = sweep.working_dir.take().unwrap_or_else(|| PathBuf::from("."));
            sweep.working_dir = Some(rebase(base, dir));
            sweep.destination = rebase(output_dir, std::mem::take(&mut sweep.destination));
        }
        Ok(plan)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let sweeps = match serde_json::from_str::<PlanFile>(text)? {
            PlanFile::Wrapped(plan) => plan.sweeps,
            PlanFile::List(sweeps) => sweeps,
            PlanFile::Single(sweep) => vec![*sweep],
        };
        if sweeps.is_empty() {
            bail!("plan contains no sweeps");
        }
        for sweep in &sweeps {
            sweep
                .validate()
                .with_context(|| format!("invalid sweep `{}`", sweep.name))?;
        }
        Ok(Self { sweeps })
    }

    /// Writes the built-in `rotation` sweep as a starting point for new plans.
    pub fn write_example(path: &Path) -> Result<()> {
        let plan = Self {
            sweeps: drivers::rotation::sweeps(Path::new("."))?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(&plan)?)
            .with_context(|| format!("writing plan file: {}", path.display()))?;
        Ok(())
    }
}

fn rebase(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path
    } else {
        base.join(path)
    }
}
