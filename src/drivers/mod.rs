//! Built-in sweep definitions for the EasyPAP `./run` benchmark.
//!
//! Each driver returns independent, immutable sweeps; later sweeps never
//! reuse or mutate the axes of earlier ones.

use std::path::Path;

use crate::{error::Result, sweep::SweepConfig};

pub mod life;
pub mod life_ocl;
pub mod rotation;

/// Program every driver invokes, relative to [`WORKING_DIR`].
pub const PROGRAM: &str = "./run";
pub const WORKING_DIR: &str = ".";

pub struct Driver {
    pub name: &'static str,
    pub description: &'static str,
    pub sweeps: fn(&Path) -> Result<Vec<SweepConfig>>,
    /// Also includes sweeps that are kept but disabled by default.
    pub all_sweeps: Option<fn(&Path) -> Result<Vec<SweepConfig>>>,
}

impl Driver {
    pub fn build(&self, output_dir: &Path, include_disabled: bool) -> Result<Vec<SweepConfig>> {
        match self.all_sweeps {
            Some(all) if include_disabled => all(output_dir),
            _ => (self.sweeps)(output_dir),
        }
    }
}

pub const DRIVERS: &[Driver] = &[
    Driver {
        name: "life",
        description: "life kernel, omp_tiled/omp_tiled_lazy over tile sizes and threads, then tiled on one thread",
        sweeps: life::sweeps,
        all_sweeps: None,
    },
    Driver {
        name: "life-ocl",
        description: "life kernel on octa_off, sequential tiled baseline",
        sweeps: life_ocl::sweeps,
        all_sweeps: Some(life_ocl::all),
    },
    Driver {
        name: "rotation",
        description: "rotation90 kernel over variants, tile sizes, image sizes and threads",
        sweeps: rotation::sweeps,
        all_sweeps: None,
    },
];

pub fn find(name: &str) -> Option<&'static Driver> {
    DRIVERS.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_driver_builds() {
        for driver in DRIVERS {
            let sweeps = (driver.sweeps)(Path::new("results")).unwrap();
            assert!(!sweeps.is_empty(), "{} has no sweeps", driver.name);
            for s in &sweeps {
                assert_eq!(s.program, PROGRAM);
                assert!(s.destination.starts_with("results"));
            }
        }
    }

    #[test]
    fn test_disabled_sweeps_only_on_request() {
        let driver = find("life-ocl").unwrap();
        assert_eq!(driver.build(Path::new("."), false).unwrap().len(), 1);
        assert_eq!(driver.build(Path::new("."), true).unwrap().len(), 3);
        assert_eq!(find("life").unwrap().build(Path::new("."), true).unwrap().len(), 2);
    }

    #[test]
    fn test_find_driver() {
        assert!(find("rotation").is_some());
        assert!(find("mandel").is_none());
    }
}
