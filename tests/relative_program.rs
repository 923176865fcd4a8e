#![cfg(unix)]

use std::{fs, os::unix::fs::PermissionsExt};

use anyhow::Result;
use sweeprun::{Axis, Parser, SweepConfig, SweepRunner};

// Lives in its own test binary: the stub is executed directly, and no other
// test may be spawning children while it is being written.
#[tokio::test]
async fn test_program_resolves_against_working_dir() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let run = dir.path().join("run");
    fs::write(&run, "#!/bin/sh\necho \"Computation completed after $2.0 ms\"\n")?;
    fs::set_permissions(&run, fs::Permissions::from_mode(0o755))?;
    let out = dir.path().join("plots").join("data").join("life.csv");

    let cfg = SweepConfig::builder("./run", &out)
        .working_dir(dir.path())
        .flag(Axis::from_legacy("-i ", [500, 1000]))
        .parser("after:completed after".parse::<Parser>().map_err(anyhow::Error::msg)?)
        .build()?;
    let report = SweepRunner::new(cfg)?.run_until(std::future::pending()).await?;

    assert_eq!(report.rows_written, 2);
    assert_eq!(
        fs::read_to_string(&out)?,
        "i,measurement\n500,500.0\n1000,1000.0\n"
    );
    Ok(())
}
