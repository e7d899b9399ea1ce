//! Behavioural checks any [`BatchEvaluator`] must pass
//!
//! Each check builds its own scene, drives the evaluator through
//! [`step_system_with`] or [`BatchEvaluator::evaluate_batch`] and panics on
//! the first violation, so the same suite runs against the CPU reference and
//! against accelerated backends with a looser [`Tolerance`].

use crate::batch::{BatchEvaluator, ScalarEvaluator};
use crate::body::Body;
use crate::config::SimulationConfig;
use crate::error::Error;
use crate::field::{FieldMode, FieldParams, Source};
use crate::integrator::{step_system, step_system_with, UpdateStrategy};
use crate::system::BodySystem;
use crate::vector::Vector;
use approx::relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;

/// How far an evaluator may stray from exact f64 arithmetic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub epsilon: f64,
    pub max_relative: f64,
}

impl Tolerance {
    /// Double precision CPU paths
    pub const F64: Self = Self {
        epsilon: 1e-12,
        max_relative: 1e-9,
    };

    /// Single precision device paths
    pub const F32: Self = Self {
        epsilon: 1e-7,
        max_relative: 1e-4,
    };

    pub fn close(&self, a: f64, b: f64) -> bool {
        relative_eq!(a, b, epsilon = self.epsilon, max_relative = self.max_relative)
    }

    /// Compares whole vectors so a near-zero component is judged against the
    /// vector's length rather than its own size
    pub fn close_vectors<const D: usize>(&self, a: &Vector<D>, b: &Vector<D>) -> bool {
        let diff = (*a - *b).length();
        diff <= self.epsilon || diff <= self.max_relative * a.length().max(b.length())
    }

    fn assert_vectors<const D: usize>(&self, actual: &Vector<D>, expected: &Vector<D>, what: &str) {
        assert!(
            self.close_vectors(actual, expected),
            "{what}: got {actual:?}, expected {expected:?}"
        );
    }
}

fn galaxies(n_tracers: usize, distance: f64, center: [f64; 2]) -> BodySystem<2> {
    let config = SimulationConfig {
        n_tracers,
        distance,
        center,
        ..Default::default()
    };
    match BodySystem::galaxy_pair(&config, &mut StdRng::seed_from_u64(42)) {
        Ok(system) => system,
        Err(err) => panic!("galaxy pair rejected: {err}"),
    }
}

fn step(system: &mut BodySystem<2>, dt: f64, evaluator: &mut dyn BatchEvaluator<2>) {
    if let Err(err) = step_system_with(system, dt, evaluator) {
        panic!("{} step failed: {err}", evaluator.name());
    }
}

/// Equal galaxies keep their midpoint fixed and their momenta opposite
pub fn check_mirror_symmetry(evaluator: &mut dyn BatchEvaluator<2>, tolerance: Tolerance) {
    let center = Vector::new([100.0, -50.0]);
    let distance = 200.0;

    for dt in [0.1, 0.7, 3.0] {
        let mut system = galaxies(0, distance, center.0);
        let speed = system.massive()[0].velocity.length();

        for _ in 0..200 {
            step(&mut system, dt, evaluator);

            let [a, b] = system.massive() else {
                panic!("expected two galaxies");
            };
            let midpoint = (a.position + b.position) / 2.0;
            let net_velocity = a.velocity + b.velocity;
            for d in 0..2 {
                assert!(
                    (midpoint[d] - center[d]).abs() <= tolerance.max_relative * distance,
                    "{}: midpoint drifted to {:?} at dt {dt}",
                    evaluator.name(),
                    midpoint
                );
                assert!(
                    net_velocity[d].abs() <= tolerance.max_relative * speed,
                    "{}: net velocity {:?} at dt {dt}",
                    evaluator.name(),
                    net_velocity
                );
            }
        }
    }
}

/// A seeded circular orbit returns to its start after one period
pub fn check_orbit_closure(evaluator: &mut dyn BatchEvaluator<2>) {
    let r = 100.0_f64;
    let m = 100.0_f64;
    let period = 2.0 * PI * r * r.sqrt() / (2.0 * m).sqrt();
    let n_steps = 1000;
    let dt = period / n_steps as f64;

    let start = galaxies(0, r, [0.0, 0.0]);
    let speed = start.massive()[0].velocity.length();
    let mut system = start.clone();
    let mut min_sep = f64::MAX;
    let mut max_sep = 0.0_f64;

    for _ in 0..n_steps {
        step(&mut system, dt, evaluator);
        let [a, b] = system.massive() else {
            panic!("expected two galaxies");
        };
        let sep = a.position.distance(&b.position);
        min_sep = min_sep.min(sep);
        max_sep = max_sep.max(sep);
    }

    let name = evaluator.name();
    assert!(max_sep / r - 1.0 < 0.05, "{name}: separation grew to {max_sep}");
    assert!(1.0 - min_sep / r < 0.05, "{name}: separation shrank to {min_sep}");
    for (end, begin) in system.massive().iter().zip(start.massive()) {
        assert!(end.position.distance(&begin.position) < 0.05 * r);
        assert!((end.velocity.length() / speed - 1.0).abs() < 0.05);
    }
}

/// Tracers feel the galaxies but never pull on them
pub fn check_tracers_do_not_pull(evaluator: &mut dyn BatchEvaluator<2>) {
    let mut bare = galaxies(0, 384.0, [0.0, 0.0]);

    for n in [1, 50, 400] {
        let mut with_tracers = galaxies(n, 384.0, [0.0, 0.0]);
        let mut without = bare.clone();
        let start: Vec<Body<2>> = with_tracers.tracers().to_vec();

        for _ in 0..20 {
            step(&mut with_tracers, 0.5, evaluator);
            step(&mut without, 0.5, evaluator);
        }
        assert_eq!(
            with_tracers.massive(),
            without.massive(),
            "{}: {n} tracers moved the galaxies",
            evaluator.name()
        );
        for (moved, begin) in with_tracers.tracers().iter().zip(&start) {
            assert_ne!(moved.acceleration, Vector::ZERO);
            assert_ne!(moved.velocity, begin.velocity);
        }
    }

    step(&mut bare, 0.5, evaluator);
    assert!(bare.tracers().is_empty());
}

/// Zero timesteps, empty systems and coincident bodies stay well defined
pub fn check_degenerate_input(evaluator: &mut dyn BatchEvaluator<2>, tolerance: Tolerance) {
    let name = evaluator.name();
    let params = FieldParams::default();

    let start = galaxies(64, 384.0, [0.0, 0.0]);
    let mut system = start.clone();
    step(&mut system, 0.0, evaluator);
    let before = start.massive().iter().chain(start.tracers());
    let after = system.massive().iter().chain(system.tracers());
    for (a, b) in after.zip(before) {
        assert_eq!(a.position, b.position, "{name}: zero dt moved a body");
        assert_eq!(a.velocity, b.velocity, "{name}: zero dt changed a velocity");
        tolerance.assert_vectors(&a.acceleration, &b.acceleration, name);
    }

    let mut empty = BodySystem::new(Vec::new(), Vec::new(), params);
    step(&mut empty, 0.5, evaluator);
    assert_eq!(empty.body_count(), 0);

    let none = match evaluator.evaluate_batch(&[], &[], &params, FieldMode::SelfConsistent) {
        Ok(none) => none,
        Err(err) => panic!("{name}: empty batch failed: {err}"),
    };
    assert!(none.is_empty());

    let target = Vector::new([5.0, 5.0]);
    let sourceless = match evaluator.evaluate_batch(&[target], &[], &params, FieldMode::Passive) {
        Ok(a) => a,
        Err(err) => panic!("{name}: sourceless batch failed: {err}"),
    };
    assert_eq!(sourceless, vec![Vector::ZERO]);

    let coincident = [Source::new(target, 100.0), Source::new(target, 100.0)];
    let stacked = [target, target];
    for mode in [FieldMode::SelfConsistent, FieldMode::Passive] {
        let a = match evaluator.evaluate_batch(&stacked, &coincident, &params, mode) {
            Ok(a) => a,
            Err(err) => panic!("{name}: coincident batch failed: {err}"),
        };
        assert_eq!(a, vec![Vector::ZERO; 2], "{name}: coincident bodies in {mode:?}");
    }

    let mismatch = evaluator.evaluate_batch(
        &stacked,
        &coincident[..1],
        &params,
        FieldMode::SelfConsistent,
    );
    assert!(
        matches!(mismatch, Err(Error::ShapeMismatch { targets: 2, sources: 1 })),
        "{name}: mismatched self-consistent batch was accepted"
    );
}

/// Batch results match the scalar reference in both modes and after a step
pub fn check_matches_reference(evaluator: &mut dyn BatchEvaluator<2>, tolerance: Tolerance) {
    let name = evaluator.name();
    let start = galaxies(300, 384.0, [640.0, 360.0]);
    let params = start.params();

    let galaxy_targets: Vec<Vector<2>> = start.massive().iter().map(|b| b.position).collect();
    let tracer_targets: Vec<Vector<2>> = start.tracers().iter().map(|b| b.position).collect();
    let sources: Vec<Source<2>> = start.massive().iter().map(Source::from).collect();

    for (targets, mode) in [
        (&galaxy_targets, FieldMode::SelfConsistent),
        (&tracer_targets, FieldMode::Passive),
    ] {
        let expected = ScalarEvaluator.evaluate_batch(targets, &sources, &params, mode);
        let actual = evaluator.evaluate_batch(targets, &sources, &params, mode);
        let (Ok(expected), Ok(actual)) = (expected, actual) else {
            panic!("{name}: {mode:?} batch failed");
        };
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            tolerance.assert_vectors(a, e, name);
        }
    }

    let mut reference = start.clone();
    let mut evaluated = start;
    step_system(&mut reference, 0.5, UpdateStrategy::Batch);
    step(&mut evaluated, 0.5, evaluator);

    let expected = reference.massive().iter().chain(reference.tracers());
    let actual = evaluated.massive().iter().chain(evaluated.tracers());
    for (a, e) in actual.zip(expected) {
        tolerance.assert_vectors(&a.position, &e.position, name);
        tolerance.assert_vectors(&a.velocity, &e.velocity, name);
    }
}
