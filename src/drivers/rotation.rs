use std::path::Path;

use crate::{axis::Axis, error::Result, sweep::SweepConfig};

use super::{PROGRAM, WORKING_DIR};

pub fn sweeps(output_dir: &Path) -> Result<Vec<SweepConfig>> {
    // rotation.csv is written by the program itself via -of.
    let sweep = SweepConfig::builder(PROGRAM, output_dir.join("rotation-sweep.csv"))
        .name("rotation")
        .working_dir(WORKING_DIR)
        // OpenMP internal control variables
        .env(Axis::from_legacy("OMP_NUM_THREADS=", [1, 8, 48]))
        .env(Axis::from_legacy("OMP_SCHEDULE=", ["static"]))
        .flag(Axis::from_legacy("--kernel ", ["rotation90"]))
        .flag(Axis::from_legacy("--iterations ", [200]))
        .flag(Axis::from_legacy("--variant ", ["seq", "tiled", "omp_tiled"]))
        .flag(Axis::from_legacy("--tile-size ", [8, 16, 32]))
        .flag(Axis::from_legacy("--size ", [512, 1024, 2048, 4096]))
        .flag(Axis::from_legacy("-of ", ["rotation.csv"]))
        .repetitions(1)
        .build()?;
    Ok(vec![sweep])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_columns() {
        let sweep = &sweeps(Path::new(".")).unwrap()[0];
        assert_eq!(
            sweep.header(),
            vec![
                "OMP_NUM_THREADS",
                "OMP_SCHEDULE",
                "kernel",
                "iterations",
                "variant",
                "tile-size",
                "size",
                "of",
                "measurement"
            ]
        );
        assert_eq!(sweep.invocation_count(), 3 * 3 * 3 * 4);
    }
}
