use std::path::Path;

use crate::{axis::Axis, error::Result, sweep::SweepConfig};

use super::{PROGRAM, WORKING_DIR};

const RUNS: u32 = 4;
const SIZE: u32 = 2176;

/// Sweeps that run by default: only the sequential baseline.
pub fn sweeps(output_dir: &Path) -> Result<Vec<SweepConfig>> {
    Ok(vec![seq(output_dir)?])
}

/// All three sweeps, including the disabled OpenMP and OpenCL ones.
pub fn all(output_dir: &Path) -> Result<Vec<SweepConfig>> {
    Ok(vec![omp(output_dir)?, ocl(output_dir)?, seq(output_dir)?])
}

fn omp(output_dir: &Path) -> Result<SweepConfig> {
    SweepConfig::builder(PROGRAM, output_dir.join("life-ocl-omp.csv"))
        .name("life-ocl-omp")
        .working_dir(WORKING_DIR)
        .env(Axis::from_legacy("OMP_NUM_THREADS=", [4]))
        .flag(Axis::from_legacy("-k ", ["life"]))
        .flag(Axis::from_legacy("-i ", [500]))
        .flag(Axis::from_legacy("-v ", ["omp_tiled"]))
        .flag(Axis::from_legacy("-s ", [SIZE]))
        .flag(Axis::from_legacy("-ts ", [8, 16, 32]))
        .flag(Axis::from_legacy("-a ", ["octa_off"]))
        .flag(Axis::from_legacy("-of ", ["./plots/data/life_seq.csv"]))
        .repetitions(RUNS)
        .build()
}

/// GPU variant: `-o` switches the program to OpenCL, no OpenMP env.
fn ocl(output_dir: &Path) -> Result<SweepConfig> {
    SweepConfig::builder(PROGRAM, output_dir.join("life-ocl-gpu.csv"))
        .name("life-ocl-gpu")
        .working_dir(WORKING_DIR)
        .flag(Axis::from_legacy("-k ", ["life"]))
        .flag(Axis::from_legacy("-i ", [500]))
        .flag(Axis::from_legacy("-v ", ["ocl"]))
        .flag(Axis::from_legacy("-s ", [SIZE]))
        .flag(Axis::from_legacy("-ts ", [8, 16, 32]))
        .flag(Axis::from_legacy("-a ", ["octa_off"]))
        .flag(Axis::from_legacy("-of ", ["./plots/data/life_seq.csv"]))
        .flag(Axis::from_legacy("-o ", [""]))
        .repetitions(RUNS)
        .build()
}

fn seq(output_dir: &Path) -> Result<SweepConfig> {
    SweepConfig::builder(PROGRAM, output_dir.join("life-ocl-seq.csv"))
        .name("life-ocl-seq")
        .working_dir(WORKING_DIR)
        .env(Axis::from_legacy("OMP_NUM_THREADS=", [1]))
        .flag(Axis::from_legacy("-k ", ["life"]))
        .flag(Axis::from_legacy("-i ", [500]))
        .flag(Axis::from_legacy("-v ", ["tiled"]))
        .flag(Axis::from_legacy("-s ", [SIZE]))
        .flag(Axis::from_legacy("-a ", ["octa_off"]))
        .flag(Axis::from_legacy("-of ", ["./plots/data/life_seq.csv"]))
        .repetitions(RUNS)
        .build()
}
