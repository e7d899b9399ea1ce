//! CPU vs GPU timing of the tracer leapfrog step
//!
//! Every strategy starts from the same random tracer state and steps it a
//! fixed number of times; the mean wall-clock time per step is reported.

use crate::device::DeviceContext;
use crate::kernel::{DeviceSession, GravityKernels};
use crate::state::TracerState;
use gravity_physics::{acceleration_at, Error, FieldMode, FieldParams, Result, Source, Vector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// One way of advancing a [`TracerState`] through a fixed field
pub trait IntegrationStrategy<const D: usize> {
    fn name(&self) -> &'static str;

    /// Advance by one kick-drift-kick step of length `dt`
    fn step(&mut self, dt: f64) -> Result<()>;

    /// Current state, downloaded if it lives elsewhere
    fn state(&self) -> Result<TracerState<D>>;
}

fn kicked<const D: usize>(
    velocities: &[Vector<D>],
    accelerations: &[Vector<D>],
    dt: f64,
) -> Vec<Vector<D>> {
    velocities
        .iter()
        .zip(accelerations)
        .map(|(v, a)| *v + *a * (dt / 2.0))
        .collect()
}

fn drifted<const D: usize>(
    positions: &[Vector<D>],
    velocities: &[Vector<D>],
    dt: f64,
) -> Vec<Vector<D>> {
    positions
        .iter()
        .zip(velocities)
        .map(|(x, v)| *x + *v * dt)
        .collect()
}

fn field_at<const D: usize>(
    position: &Vector<D>,
    sources: &[Source<D>],
    params: &FieldParams,
) -> Vector<D> {
    acceleration_at(
        position,
        sources.iter().map(|s| (s.position, s.mass)),
        params,
        None,
    )
}

/// Builds fresh arrays for every phase of the step
pub struct ReferenceCpu<const D: usize> {
    state: TracerState<D>,
    sources: Vec<Source<D>>,
    params: FieldParams,
}

impl<const D: usize> ReferenceCpu<D> {
    pub fn new(state: TracerState<D>, sources: Vec<Source<D>>, params: FieldParams) -> Self {
        Self {
            state,
            sources,
            params,
        }
    }
}

impl<const D: usize> IntegrationStrategy<D> for ReferenceCpu<D> {
    fn name(&self) -> &'static str {
        "CPU"
    }

    fn step(&mut self, dt: f64) -> Result<()> {
        let half = kicked(&self.state.velocities, &self.state.accelerations, dt);
        let positions = drifted(&self.state.positions, &half, dt);
        let accelerations: Vec<Vector<D>> = positions
            .iter()
            .map(|x| field_at(x, &self.sources, &self.params))
            .collect();
        let velocities = kicked(&half, &accelerations, dt);

        self.state = TracerState {
            positions,
            velocities,
            accelerations,
        };
        Ok(())
    }

    fn state(&self) -> Result<TracerState<D>> {
        Ok(self.state.clone())
    }
}

/// Updates the arrays in place, one body at a time
pub struct InPlaceCpu<const D: usize> {
    state: TracerState<D>,
    sources: Vec<Source<D>>,
    params: FieldParams,
}

impl<const D: usize> InPlaceCpu<D> {
    pub fn new(state: TracerState<D>, sources: Vec<Source<D>>, params: FieldParams) -> Self {
        Self {
            state,
            sources,
            params,
        }
    }
}

impl<const D: usize> IntegrationStrategy<D> for InPlaceCpu<D> {
    fn name(&self) -> &'static str {
        "CPU Fast"
    }

    fn step(&mut self, dt: f64) -> Result<()> {
        let TracerState {
            positions,
            velocities,
            accelerations,
        } = &mut self.state;

        let bodies = positions
            .iter_mut()
            .zip(velocities.iter_mut())
            .zip(accelerations.iter_mut());
        for ((x, v), a) in bodies {
            *v += *a * (dt / 2.0);
            *x += *v * dt;
            *a = field_at(x, &self.sources, &self.params);
            *v += *a * (dt / 2.0);
        }
        Ok(())
    }

    fn state(&self) -> Result<TracerState<D>> {
        Ok(self.state.clone())
    }
}

/// State resident in device buffers; three kernel passes per step
pub struct DeviceStrategy<const D: usize> {
    session: DeviceSession<D>,
}

impl<const D: usize> DeviceStrategy<D> {
    pub fn new(
        context: Arc<DeviceContext>,
        kernels: Arc<GravityKernels>,
        state: &TracerState<D>,
        sources: &[Source<D>],
        params: &FieldParams,
    ) -> Result<Self> {
        let session =
            DeviceSession::new(context, kernels, state, sources, params, FieldMode::Passive)?;
        Ok(Self { session })
    }
}

impl<const D: usize> IntegrationStrategy<D> for DeviceStrategy<D> {
    fn name(&self) -> &'static str {
        "GPU"
    }

    fn step(&mut self, dt: f64) -> Result<()> {
        Ok(self.session.step(dt)?)
    }

    fn state(&self) -> Result<TracerState<D>> {
        Ok(self.session.read_state()?)
    }
}

/// Benchmark setup
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig<const D: usize> {
    /// Number of tracers
    pub size: usize,
    pub iterations: usize,
    pub dt: f64,
    /// Tracer coordinates are drawn from `[0, spread)`
    pub spread: f64,
    pub sources: Vec<Source<D>>,
    pub params: FieldParams,
    pub seed: Option<u64>,
}

impl Default for BenchmarkConfig<1> {
    fn default() -> Self {
        Self {
            size: 10_000,
            iterations: 100,
            dt: 0.01,
            spread: 10.0,
            sources: vec![
                Source::new(Vector::new([-2.0]), 1.0),
                Source::new(Vector::new([2.0]), 1.0),
            ],
            params: FieldParams::default(),
            seed: None,
        }
    }
}

impl<const D: usize> BenchmarkConfig<D> {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "benchmark needs at least one iteration".into(),
            ));
        }
        gravity_physics::validate_dt(self.dt)?;
        if !self.spread.is_finite() || self.spread <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "spread must be positive, got {}",
                self.spread
            )));
        }
        Ok(())
    }

    /// Random tracers with accelerations already evaluated
    pub fn initial_state(&self) -> Result<TracerState<D>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut state = TracerState::random(self.size, self.spread, &mut rng);
        state.accelerate(&self.sources, &self.params)?;
        Ok(state)
    }
}

/// Mean step time of one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub strategy: &'static str,
    pub iterations: usize,
    pub average_ms: f64,
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] average time = {:.3} ms", self.strategy, self.average_ms)
    }
}

/// Receives results as each strategy finishes
pub trait ReportSink {
    fn report(&mut self, result: &BenchmarkResult);
}

/// Logs each result at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReport;

impl ReportSink for LogReport {
    fn report(&mut self, result: &BenchmarkResult) {
        log::info!("{result}");
    }
}

impl ReportSink for Vec<BenchmarkResult> {
    fn report(&mut self, result: &BenchmarkResult) {
        self.push(result.clone());
    }
}

/// Step `strategy` `iterations` times and average the wall-clock time
pub fn time_strategy<const D: usize, S>(
    strategy: &mut S,
    iterations: usize,
    dt: f64,
) -> Result<BenchmarkResult>
where
    S: IntegrationStrategy<D> + ?Sized,
{
    let mut total_ms = 0.0;
    for _ in 0..iterations {
        let start = Instant::now();
        strategy.step(dt)?;
        total_ms += start.elapsed().as_secs_f64() * 1000.0;
    }

    Ok(BenchmarkResult {
        strategy: strategy.name(),
        iterations,
        average_ms: if iterations == 0 {
            0.0
        } else {
            total_ms / iterations as f64
        },
    })
}

fn device_strategy<const D: usize>(
    context: Arc<DeviceContext>,
    initial: &TracerState<D>,
    config: &BenchmarkConfig<D>,
) -> Result<DeviceStrategy<D>> {
    let kernels = Arc::new(GravityKernels::new(&context.device)?);
    DeviceStrategy::new(context, kernels, initial, &config.sources, &config.params)
}

/// Time the GPU (when `device` is given), reference CPU and in-place CPU strategies
pub fn run_benchmark<const D: usize>(
    config: &BenchmarkConfig<D>,
    device: Option<Arc<DeviceContext>>,
    sink: &mut dyn ReportSink,
) -> Result<Vec<BenchmarkResult>> {
    config.validate()?;
    let initial = config.initial_state()?;
    log::info!(
        "Benchmarking {} tracers, {} iterations, dt = {}",
        config.size,
        config.iterations,
        config.dt
    );

    let mut strategies: Vec<Box<dyn IntegrationStrategy<D>>> = Vec::new();
    match device {
        Some(context) => match device_strategy(context, &initial, config) {
            Ok(strategy) => strategies.push(Box::new(strategy)),
            Err(err) => log::warn!("GPU strategy unavailable ({err}), timing CPU only"),
        },
        None => log::warn!("No GPU available, skipping device strategy"),
    }
    strategies.push(Box::new(ReferenceCpu::new(
        initial.clone(),
        config.sources.clone(),
        config.params,
    )));
    strategies.push(Box::new(InPlaceCpu::new(
        initial,
        config.sources.clone(),
        config.params,
    )));

    let mut results = Vec::with_capacity(strategies.len());
    for mut strategy in strategies {
        let result = time_strategy(strategy.as_mut(), config.iterations, config.dt)?;
        sink.report(&result);
        results.push(result);
    }
    Ok(results)
}
