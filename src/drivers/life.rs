use std::path::Path;

use crate::{axis::Axis, error::Result, sweep::SweepConfig};

use super::{PROGRAM, WORKING_DIR};

const RUNS: u32 = 4;

pub fn sweeps(output_dir: &Path) -> Result<Vec<SweepConfig>> {
    let omp = SweepConfig::builder(PROGRAM, output_dir.join("life-omp.csv"))
        .name("life-omp")
        .working_dir(WORKING_DIR)
        .env(Axis::from_legacy("OMP_NUM_THREADS=", [2, 4, 8]))
        .flag(Axis::from_legacy("-k ", ["life"]))
        .flag(Axis::from_legacy("-i ", [500]))
        .flag(Axis::from_legacy("-v ", ["omp_tiled", "omp_tiled_lazy"]))
        .flag(Axis::from_legacy("-s ", [1024]))
        .flag(Axis::from_legacy("-ts ", [8, 16, 32]))
        .flag(Axis::from_legacy("-a ", ["guns"]))
        .flag(Axis::from_legacy("-of ", ["./plots/data/life.csv"]))
        .repetitions(RUNS)
        .verbose(true)
        .build()?;

    // Sequential reference: no tile-size axis, one thread.
    let seq = SweepConfig::builder(PROGRAM, output_dir.join("life-seq.csv"))
        .name("life-seq")
        .working_dir(WORKING_DIR)
        .env(Axis::from_legacy("OMP_NUM_THREADS=", [1]))
        .flag(Axis::from_legacy("-k ", ["life"]))
        .flag(Axis::from_legacy("-i ", [500]))
        .flag(Axis::from_legacy("-v ", ["tiled"]))
        .flag(Axis::from_legacy("-s ", [1024]))
        .flag(Axis::from_legacy("-a ", ["guns"]))
        .flag(Axis::from_legacy("-of ", ["./plots/data/life.csv"]))
        .repetitions(RUNS)
        .build()?;

    Ok(vec![omp, seq])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_life_sweep_sizes() {
        let sweeps = sweeps(Path::new(".")).unwrap();
        assert_eq!(sweeps[0].invocation_count(), 3 * 2 * 3 * RUNS as usize);
        assert_eq!(sweeps[1].invocation_count(), RUNS as usize);
        assert!(!sweeps[1].header().contains(&"ts".to_string()));
        assert!(sweeps[0].verbose && !sweeps[1].verbose);
    }
}
