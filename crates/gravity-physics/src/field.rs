//! Pairwise gravitational acceleration
//!
//! Brute force over every source: O(D·M) per target. Each target only reads
//! positions and masses, so evaluations for different targets are independent
//! and can run in any order (or on the device, one invocation per target).

use crate::body::Body;
use crate::constants::{G, MIN_DISTANCE};
use crate::vector::Vector;

/// Constants every field evaluation depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    /// Gravitational constant
    pub g: f64,
    /// Sources closer than this to the target are skipped entirely
    pub min_distance: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            g: G,
            min_distance: MIN_DISTANCE,
        }
    }
}

/// A force source reduced to what the field needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source<const D: usize> {
    pub position: Vector<D>,
    pub mass: f64,
}

impl<const D: usize> Source<D> {
    pub fn new(position: Vector<D>, mass: f64) -> Self {
        Self { position, mass }
    }
}

impl<const D: usize> From<&Body<D>> for Source<D> {
    fn from(body: &Body<D>) -> Self {
        Self {
            position: body.position,
            mass: body.mass,
        }
    }
}

/// Which sources a target feels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Targets are the sources themselves; target `i` skips source `i`
    SelfConsistent,
    /// Targets feel every source and exert nothing back
    Passive,
}

impl FieldMode {
    /// Source index to leave out for target `index`
    pub fn exclusion(self, index: usize) -> Option<usize> {
        match self {
            FieldMode::SelfConsistent => Some(index),
            FieldMode::Passive => None,
        }
    }
}

/// Net acceleration at `target` from `(position, mass)` sources
///
/// A source closer than `params.min_distance` (unsquared distance) contributes
/// nothing. The source at index `exclude`, if any, is never added.
pub fn acceleration_at<const D: usize, I>(
    target: &Vector<D>,
    sources: I,
    params: &FieldParams,
    exclude: Option<usize>,
) -> Vector<D>
where
    I: IntoIterator<Item = (Vector<D>, f64)>,
{
    let mut a = Vector::ZERO;
    for (j, (position, mass)) in sources.into_iter().enumerate() {
        if exclude == Some(j) {
            continue;
        }
        let diff = position - *target;
        let dist = diff.length();
        if dist < params.min_distance {
            continue;
        }
        let a_mag = params.g * mass / (dist * dist);
        for d in 0..D {
            a[d] += a_mag * (diff[d] / dist);
        }
    }
    a
}

/// Speed of a circular orbit at `orbiter` around `host`: `sqrt(G·m / r)`
pub fn circular_velocity<const D: usize>(orbiter: &Vector<D>, host: &Body<D>, g: f64) -> f64 {
    let dist = orbiter.distance(&host.position);
    (g * host.mass / dist).sqrt()
}

/// Acceleration at a position, given the index of the body standing there
///
/// This is the strategy the integrator calls after drifting a body.
pub trait AccelerationEvaluator<const D: usize> {
    fn evaluate(&self, index: usize, position: &Vector<D>) -> Vector<D>;
}

/// Field of the massive bodies as felt by one of them (self excluded)
pub struct SelfConsistentField<'a, const D: usize> {
    sources: &'a [Body<D>],
    params: FieldParams,
}

impl<'a, const D: usize> SelfConsistentField<'a, D> {
    pub fn new(sources: &'a [Body<D>], params: FieldParams) -> Self {
        Self { sources, params }
    }
}

impl<const D: usize> AccelerationEvaluator<D> for SelfConsistentField<'_, D> {
    fn evaluate(&self, index: usize, position: &Vector<D>) -> Vector<D> {
        acceleration_at(
            position,
            self.sources.iter().map(|b| (b.position, b.mass)),
            &self.params,
            Some(index),
        )
    }
}

/// Field of the massive bodies as felt by a tracer
pub struct PassiveField<'a, const D: usize> {
    sources: &'a [Body<D>],
    params: FieldParams,
}

impl<'a, const D: usize> PassiveField<'a, D> {
    pub fn new(sources: &'a [Body<D>], params: FieldParams) -> Self {
        Self { sources, params }
    }
}

impl<const D: usize> AccelerationEvaluator<D> for PassiveField<'_, D> {
    fn evaluate(&self, _index: usize, position: &Vector<D>) -> Vector<D> {
        acceleration_at(
            position,
            self.sources.iter().map(|b| (b.position, b.mass)),
            &self.params,
            None,
        )
    }
}
