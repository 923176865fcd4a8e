mod cli;

use std::io;

use anyhow::{anyhow, bail, Context, Result};
use cli::Command;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use sweeprun::{
    config::{Config, Overrides},
    drivers::{self, DRIVERS},
    logging,
    plan::Plan,
    Parser, SweepConfig, SweepRunner,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let cfg = Config::load();
    logging::init_logging(&cfg.log_level());

    let output_dir = args.output_dir.clone().unwrap_or_else(|| cfg.output_dir());

    let sweeps = match &args.command {
        Command::List => {
            for d in DRIVERS {
                println!("{:<10} {}", d.name.bold(), d.description);
            }
            return Ok(());
        }
        Command::Init { file } => {
            Plan::write_example(file)?;
            println!("Wrote example plan to {}", file.display());
            return Ok(());
        }
        Command::Run { drivers: names, all } => {
            let mut sweeps = Vec::new();
            for name in names {
                let driver = drivers::find(name)
                    .ok_or_else(|| anyhow!("unknown driver: {} (see `sweeprun list`)", name))?;
                sweeps.extend(driver.build(&output_dir, *all)?);
            }
            sweeps
        }
        Command::Plan { file } => Plan::load(file, &output_dir)?.sweeps,
    };

    let overrides = overrides(&args)?;
    let sweeps = sweeps
        .into_iter()
        .map(|s| cfg.apply(s, &overrides))
        .collect::<sweeprun::Result<Vec<_>>>()?;

    if args.dry_run {
        for sweep in sweeps {
            print_invocations(sweep)?;
        }
        return Ok(());
    }

    for sweep in sweeps {
        let name = sweep.name.clone();
        let verbose = sweep.verbose;
        let runner = SweepRunner::new(sweep)?;
        let report = runner
            .run()
            .await
            .with_context(|| format!("sweep `{}` aborted", name))?;
        if verbose {
            println!("{}", report.summary());
            for line in report.failure_lines(io::stderr().is_terminal()) {
                eprintln!("{line}");
            }
        }
        if report.interrupted {
            bail!(
                "interrupted; partial results kept in {}",
                report.destination.display()
            );
        }
    }
    Ok(())
}

/// Command-line flags as config overrides; unset flags defer to `.sweeprc`/env.
fn overrides(args: &cli::Cli) -> Result<Overrides> {
    let parser = args
        .parser
        .as_deref()
        .map(|p| p.parse::<Parser>().map_err(|e| anyhow!(e)))
        .transpose()?;
    Ok(Overrides {
        verbose: pick(args.verbose, args.quiet),
        timeout_secs: args.timeout,
        abort_on_nonzero: pick(args.abort_on_nonzero, args.continue_on_nonzero),
        record_failures: args.record_failures,
        parser,
        working_dir: args.workdir.clone(),
    })
}

/// Resolves an on/off switch pair; clap rejects both at once.
fn pick(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn print_invocations(sweep: SweepConfig) -> Result<()> {
    let header = format!(
        "# {} ({} combinations x {} runs -> {})",
        sweep.name,
        sweep.combination_count(),
        sweep.repetitions,
        sweep.destination.display()
    );
    println!("{}", header.bold());
    let runner = SweepRunner::new(sweep)?;
    for inv in runner.invocations()? {
        println!("{}", inv.display_line());
    }
    Ok(())
}
