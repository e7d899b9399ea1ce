//! Leapfrog (kick-drift-kick) time integration
//!
//! Per body, given `(x, v, a)` at time t:
//!
//! 1. Kick: `v½ = v + a·dt/2`
//! 2. Drift: `x' = x + v½·dt`
//! 3. Evaluate: `a' = field(x')`
//! 4. Kick: `v' = v½ + a'·dt/2`
//!
//! At system level all massive bodies are drifted before any of them is
//! re-evaluated, so every massive acceleration for t + dt sees the same
//! snapshot. Tracers go afterwards and feel the galaxies at t + dt.
//!
//! `dt` is not validated: zero leaves the state unchanged and negative values
//! run time backwards.

use crate::batch::BatchEvaluator;
use crate::body::Body;
use crate::error::{Error, Result};
use crate::field::{AccelerationEvaluator, FieldMode, PassiveField, SelfConsistentField, Source};
use crate::system::BodySystem;
use crate::vector::Vector;

/// How a system step writes its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// Build new body arrays and swap them in once the whole step is done
    #[default]
    Batch,
    /// Mutate the existing arrays phase by phase
    InPlace,
}

/// Velocity half step using the cached acceleration
pub fn half_kick<const D: usize>(body: &mut Body<D>, dt: f64) {
    body.velocity += body.acceleration * (dt / 2.0);
}

/// Full position step using the current velocity
pub fn drift<const D: usize>(body: &mut Body<D>, dt: f64) {
    body.position += body.velocity * dt;
}

/// Advance one body by `dt`, re-evaluating `field` at its new position
pub fn leapfrog_step<const D: usize, E>(body: &mut Body<D>, index: usize, dt: f64, field: &E)
where
    E: AccelerationEvaluator<D> + ?Sized,
{
    half_kick(body, dt);
    drift(body, dt);
    body.acceleration = field.evaluate(index, &body.position);
    half_kick(body, dt);
}

fn kicked_and_drifted<const D: usize>(body: &Body<D>, dt: f64) -> Body<D> {
    let mut next = *body;
    half_kick(&mut next, dt);
    drift(&mut next, dt);
    next
}

fn settled<const D: usize>(body: &Body<D>, acceleration: Vector<D>, dt: f64) -> Body<D> {
    let mut next = *body;
    next.acceleration = acceleration;
    half_kick(&mut next, dt);
    next
}

/// Advance every body of `system` by one step
pub fn step_system<const D: usize>(system: &mut BodySystem<D>, dt: f64, strategy: UpdateStrategy) {
    match strategy {
        UpdateStrategy::Batch => step_batch(system, dt),
        UpdateStrategy::InPlace => step_in_place(system, dt),
    }
}

fn step_batch<const D: usize>(system: &mut BodySystem<D>, dt: f64) {
    let params = system.params;

    let drifted: Vec<Body<D>> = system
        .massive
        .iter()
        .map(|b| kicked_and_drifted(b, dt))
        .collect();
    let field = SelfConsistentField::new(&drifted, params);
    let massive: Vec<Body<D>> = drifted
        .iter()
        .enumerate()
        .map(|(i, b)| settled(b, field.evaluate(i, &b.position), dt))
        .collect();

    let field = PassiveField::new(&massive, params);
    let tracers: Vec<Body<D>> = system
        .tracers
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let b = kicked_and_drifted(b, dt);
            settled(&b, field.evaluate(i, &b.position), dt)
        })
        .collect();

    system.massive = massive;
    system.tracers = tracers;
}

fn step_in_place<const D: usize>(system: &mut BodySystem<D>, dt: f64) {
    let params = system.params;

    for body in system.massive.iter_mut() {
        half_kick(body, dt);
        drift(body, dt);
    }
    // Only positions are read here, so writing accelerations as we go keeps
    // the snapshot consistent.
    for i in 0..system.massive.len() {
        let position = system.massive[i].position;
        let a = SelfConsistentField::new(&system.massive, params).evaluate(i, &position);
        system.massive[i].acceleration = a;
    }
    for body in system.massive.iter_mut() {
        half_kick(body, dt);
    }

    let field = PassiveField::new(&system.massive, params);
    for (i, tracer) in system.tracers.iter_mut().enumerate() {
        leapfrog_step(tracer, i, dt, &field);
    }
}

/// Batch step with accelerations supplied by `evaluator`
///
/// The system is only touched once both evaluations succeeded, so a failing
/// backend leaves the previous state intact.
pub fn step_system_with<const D: usize, E>(
    system: &mut BodySystem<D>,
    dt: f64,
    evaluator: &mut E,
) -> Result<()>
where
    E: BatchEvaluator<D> + ?Sized,
{
    let params = system.params;

    let drifted: Vec<Body<D>> = system
        .massive
        .iter()
        .map(|b| kicked_and_drifted(b, dt))
        .collect();
    let targets: Vec<Vector<D>> = drifted.iter().map(|b| b.position).collect();
    let sources: Vec<Source<D>> = drifted.iter().map(Source::from).collect();
    let accelerations =
        evaluator.evaluate_batch(&targets, &sources, &params, FieldMode::SelfConsistent)?;
    check_len(drifted.len(), accelerations.len())?;
    let massive: Vec<Body<D>> = drifted
        .iter()
        .zip(accelerations)
        .map(|(b, a)| settled(b, a, dt))
        .collect();

    let drifted: Vec<Body<D>> = system
        .tracers
        .iter()
        .map(|b| kicked_and_drifted(b, dt))
        .collect();
    let targets: Vec<Vector<D>> = drifted.iter().map(|b| b.position).collect();
    let sources: Vec<Source<D>> = massive.iter().map(Source::from).collect();
    let accelerations = evaluator.evaluate_batch(&targets, &sources, &params, FieldMode::Passive)?;
    check_len(drifted.len(), accelerations.len())?;
    let tracers: Vec<Body<D>> = drifted
        .iter()
        .zip(accelerations)
        .map(|(b, a)| settled(b, a, dt))
        .collect();

    system.massive = massive;
    system.tracers = tracers;
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::BatchLength { expected, actual });
    }
    Ok(())
}

/// Symplectic leapfrog integrator bound to one update strategy
///
/// # Examples
///
/// ```
/// use gravity_physics::{Body, BodySystem, FieldParams, Leapfrog, Vector};
///
/// let galaxies = vec![
///     Body::massive(Vector::new([-50.0, 0.0]), Vector::new([0.0, 0.5]), 100.0),
///     Body::massive(Vector::new([50.0, 0.0]), Vector::new([0.0, -0.5]), 100.0),
/// ];
/// let mut system = BodySystem::new(galaxies, Vec::new(), FieldParams::default());
///
/// Leapfrog::default().integrate(&mut system, 0.1, 10);
/// assert!(system.massive()[0].position[1] > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Leapfrog {
    pub strategy: UpdateStrategy,
}

impl Leapfrog {
    pub fn new(strategy: UpdateStrategy) -> Self {
        Self { strategy }
    }

    pub fn step<const D: usize>(&self, system: &mut BodySystem<D>, dt: f64) {
        step_system(system, dt, self.strategy);
    }

    /// Take `n_steps` steps of `dt`
    pub fn integrate<const D: usize>(&self, system: &mut BodySystem<D>, dt: f64, n_steps: usize) {
        for _ in 0..n_steps {
            self.step(system, dt);
        }
    }
}
