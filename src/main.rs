//! Colliding Galaxies
//!
//! Two galaxies on a mutual orbit, each surrounded by a disc of massless
//! tracers, integrated with kick-drift-kick leapfrog.

mod cli;
mod console;

use clap::Parser;
use cli::{BenchArgs, Cli, Command, SimulateArgs, StrategyArg};
use console::ConsoleSink;
use gravity_physics::{Result, UpdateStrategy};
use gravity_simulation::{run_benchmark, DeviceContext, LogReport, SimulationDriver, Stepping};
use std::sync::Arc;

fn simulate(args: &SimulateArgs) -> Result<()> {
    let stepping = match args.strategy {
        StrategyArg::Batch => Stepping::Cpu(UpdateStrategy::Batch),
        StrategyArg::InPlace => Stepping::Cpu(UpdateStrategy::InPlace),
        StrategyArg::Device => Stepping::device(),
    };

    let mut driver = SimulationDriver::init(&args.config())?.with_stepping(stepping);
    let initial_energy = driver.system().total_energy();

    let mut sink = ConsoleSink::new(args.report_every);
    let frames = driver.run(&mut sink, Some(args.frames))?;

    let energy = driver.system().total_energy();
    log::info!(
        "✓ {frames} frames, mean integrate {:.3} ms, energy drift {:.3e}",
        sink.average_integrate_ms(),
        (energy - initial_energy) / initial_energy.abs()
    );
    Ok(())
}

fn bench(args: &BenchArgs) -> Result<()> {
    let device = if args.cpu_only {
        None
    } else {
        match DeviceContext::blocking() {
            Ok(context) => Some(Arc::new(context)),
            Err(err) => {
                log::warn!("GPU unavailable: {err}");
                None
            }
        }
    };

    run_benchmark(&args.config(), device, &mut LogReport)?;
    Ok(())
}

fn main() {
    // Initialize logger (RUST_LOG=debug for per-frame timings)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Bench(args) => bench(args),
    };

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(1);
    }
}
