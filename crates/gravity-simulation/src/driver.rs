//! Init/step/start/stop/reset orchestration and the frame loop

use crate::evaluator::preferred_evaluator;
use gravity_physics::{
    step_system, step_system_with, validate_dt, BatchEvaluator, Body, BodySystem, Result,
    SimulationConfig, UpdateStrategy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::ControlFlow;
use std::time::Instant;

/// Read-only view of the system handed to a [`FrameSink`]
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a, const D: usize> {
    pub index: u64,
    pub time: f64,
    /// Wall-clock time of the integration step that produced this frame
    pub integrate_ms: f64,
    /// Time the sink spent presenting the previous frame, zero for the first
    pub present_ms: f64,
    pub massive: &'a [Body<D>],
    pub tracers: &'a [Body<D>],
}

/// Consumes frames; returning `Break` stops the loop
pub trait FrameSink<const D: usize> {
    fn present(&mut self, frame: &Frame<'_, D>) -> ControlFlow<()>;
}

/// Per-frame timings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub integrate_ms: f64,
    pub present_ms: f64,
}

/// How accelerations are evaluated each step
pub enum Stepping<const D: usize> {
    /// Built-in CPU stepping
    Cpu(UpdateStrategy),
    /// Batch stepping through an external evaluator
    Evaluator(Box<dyn BatchEvaluator<D>>),
}

impl<const D: usize> Stepping<D> {
    /// The GPU evaluator, or CPU batch evaluation if no adapter can be opened
    pub fn device() -> Self {
        Self::Evaluator(preferred_evaluator())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu(UpdateStrategy::Batch) => "batch",
            Self::Cpu(UpdateStrategy::InPlace) => "in-place",
            Self::Evaluator(evaluator) => evaluator.name(),
        }
    }
}

impl<const D: usize> Default for Stepping<D> {
    fn default() -> Self {
        Self::Cpu(UpdateStrategy::default())
    }
}

/// Everything the loop mutates
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState<const D: usize> {
    pub system: BodySystem<D>,
    pub dt: f64,
    pub time: f64,
    pub frame: u64,
}

pub struct SimulationDriver<const D: usize> {
    state: SimulationState<D>,
    stepping: Stepping<D>,
    running: bool,
    last_present_ms: f64,
}

impl<const D: usize> SimulationDriver<D> {
    pub fn new(system: BodySystem<D>, dt: f64) -> Result<Self> {
        validate_dt(dt)?;
        Ok(Self {
            state: SimulationState {
                system,
                dt,
                time: 0.0,
                frame: 0,
            },
            stepping: Stepping::default(),
            running: false,
            last_present_ms: 0.0,
        })
    }

    pub fn with_stepping(mut self, stepping: Stepping<D>) -> Self {
        self.stepping = stepping;
        self
    }

    pub fn set_stepping(&mut self, stepping: Stepping<D>) {
        self.stepping = stepping;
    }

    pub fn stepping(&self) -> &Stepping<D> {
        &self.stepping
    }

    pub fn state(&self) -> &SimulationState<D> {
        &self.state
    }

    pub fn system(&self) -> &BodySystem<D> {
        &self.state.system
    }

    /// Change the timestep without resetting the system
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        validate_dt(dt)?;
        self.state.dt = dt;
        Ok(())
    }

    /// Swap in a new system and restart the clock
    pub fn replace(&mut self, system: BodySystem<D>) {
        self.state.system = system;
        self.state.time = 0.0;
        self.state.frame = 0;
        self.last_present_ms = 0.0;
    }

    /// Advance one step; on error the system is left as it was
    pub fn step(&mut self) -> Result<()> {
        let dt = self.state.dt;
        match &mut self.stepping {
            Stepping::Cpu(strategy) => step_system(&mut self.state.system, dt, *strategy),
            Stepping::Evaluator(evaluator) => {
                step_system_with(&mut self.state.system, dt, evaluator.as_mut())?
            }
        }
        self.state.time += dt;
        self.state.frame += 1;
        Ok(())
    }

    /// Step once, then hand the result to `sink`
    pub fn advance<S>(&mut self, sink: &mut S) -> Result<(FrameStats, ControlFlow<()>)>
    where
        S: FrameSink<D> + ?Sized,
    {
        let start = Instant::now();
        self.step()?;
        let integrate_ms = start.elapsed().as_secs_f64() * 1000.0;

        let frame = Frame {
            index: self.state.frame,
            time: self.state.time,
            integrate_ms,
            present_ms: self.last_present_ms,
            massive: self.state.system.massive(),
            tracers: self.state.system.tracers(),
        };
        let start = Instant::now();
        let flow = sink.present(&frame);
        let present_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.last_present_ms = present_ms;

        log::debug!(
            "Frame {}: integrate {integrate_ms:.3} ms, present {present_ms:.3} ms",
            self.state.frame
        );

        let stats = FrameStats {
            frame: self.state.frame,
            integrate_ms,
            present_ms,
        };
        Ok((stats, flow))
    }

    pub fn start(&mut self) {
        if !self.running {
            log::info!("Simulation started ({} stepping)", self.stepping.name());
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            log::info!("Simulation stopped at frame {}", self.state.frame);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Step and present while running, for at most `max_frames` frames
    ///
    /// Returns the number of frames produced. A failed step stops the loop
    /// and is returned to the caller.
    pub fn run<S>(&mut self, sink: &mut S, max_frames: Option<u64>) -> Result<u64>
    where
        S: FrameSink<D> + ?Sized,
    {
        self.start();
        let mut frames = 0;
        while self.running && !max_frames.is_some_and(|max| frames >= max) {
            let (_, flow) = match self.advance(sink) {
                Ok(frame) => frame,
                Err(err) => {
                    self.stop();
                    return Err(err);
                }
            };
            frames += 1;
            if flow.is_break() {
                self.stop();
            }
        }
        self.stop();
        Ok(frames)
    }
}

impl SimulationDriver<2> {
    /// Seed a galaxy pair from `config`
    pub fn init(config: &SimulationConfig) -> Result<Self> {
        let system = seed_system(config)?;
        Self::new(system, config.dt)
    }

    /// Reseed from `config`, keeping the stepping choice and run flag
    pub fn reset(&mut self, config: &SimulationConfig) -> Result<()> {
        let system = seed_system(config)?;
        self.state.dt = config.dt;
        self.replace(system);
        log::info!("Simulation reset");
        Ok(())
    }
}

fn seed_system(config: &SimulationConfig) -> Result<BodySystem<2>> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    BodySystem::galaxy_pair(config, &mut rng)
}
