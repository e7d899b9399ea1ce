use clap::{Args, Parser, Subcommand, ValueEnum};
use gravity_physics::{SimulationConfig, DT, GALAXY_DISTANCE, GALAXY_MASS, TRACER_COUNT};
use gravity_simulation::BenchmarkConfig;

#[derive(Parser, Debug)]
#[command(name = "galaxies", version, about = "Two colliding galaxies with massless tracers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the frame loop headless, logging progress
    Simulate(SimulateArgs),
    /// Time the CPU and GPU tracer steps
    Bench(BenchArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Batch,
    InPlace,
    Device,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of tracers
    #[arg(short = 'n', long, default_value_t = TRACER_COUNT)]
    pub tracers: usize,

    /// Timestep per frame
    #[arg(long, default_value_t = DT, allow_negative_numbers = true)]
    pub dt: f64,

    /// Frames to run before stopping
    #[arg(short, long, default_value_t = 600)]
    pub frames: u64,

    /// Galaxy separation
    #[arg(long, default_value_t = GALAXY_DISTANCE)]
    pub distance: f64,

    /// Mass of each galaxy
    #[arg(long, default_value_t = GALAXY_MASS)]
    pub mass: f64,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = StrategyArg::Batch)]
    pub strategy: StrategyArg,

    /// Log a summary every this many frames
    #[arg(long, default_value_t = 60)]
    pub report_every: u64,
}

impl SimulateArgs {
    pub fn config(&self) -> SimulationConfig {
        SimulationConfig {
            n_tracers: self.tracers,
            dt: self.dt,
            distance: self.distance,
            galaxy_mass: self.mass,
            seed: self.seed,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Number of tracers
    #[arg(short, long, default_value_t = 10_000)]
    pub size: usize,

    #[arg(short, long, default_value_t = 100)]
    pub iterations: usize,

    #[arg(long, default_value_t = 0.01, allow_negative_numbers = true)]
    pub dt: f64,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the GPU strategy
    #[arg(long)]
    pub cpu_only: bool,
}

impl BenchArgs {
    pub fn config(&self) -> BenchmarkConfig<1> {
        BenchmarkConfig {
            size: self.size,
            iterations: self.iterations,
            dt: self.dt,
            seed: self.seed,
            ..Default::default()
        }
    }
}
