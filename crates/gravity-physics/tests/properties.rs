use approx::{assert_abs_diff_eq, assert_relative_eq};
use gravity_physics::checks::{self, Tolerance};
use gravity_physics::{
    acceleration_at, step_system, step_system_with, Body, BodySystem, FieldParams, Leapfrog,
    ScalarEvaluator, SimulationConfig, UpdateStrategy, Vector,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;

/// Galaxy pair with `n_tracers` tracers and a fixed seed
fn galaxies(n_tracers: usize, distance: f64, center: [f64; 2]) -> BodySystem<2> {
    let config = SimulationConfig {
        n_tracers,
        distance,
        center,
        ..Default::default()
    };
    BodySystem::galaxy_pair(&config, &mut StdRng::seed_from_u64(42)).unwrap()
}

fn assert_bodies_close<const D: usize>(a: &[Body<D>], b: &[Body<D>], max_relative: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        for d in 0..D {
            assert_relative_eq!(
                x.position[d],
                y.position[d],
                epsilon = 1e-12,
                max_relative = max_relative
            );
            assert_relative_eq!(
                x.velocity[d],
                y.velocity[d],
                epsilon = 1e-12,
                max_relative = max_relative
            );
        }
    }
}

// ==================================================================================
// Symmetry
// ==================================================================================

#[test]
fn equal_mass_pair_stays_mirror_symmetric() {
    let center = Vector::new([100.0, -50.0]);

    for dt in [0.1, 0.7, 3.0] {
        let mut system = galaxies(0, 200.0, center.0);
        for _ in 0..500 {
            step_system(&mut system, dt, UpdateStrategy::Batch);

            let [a, b] = system.massive() else {
                panic!("expected two galaxies");
            };
            let midpoint = (a.position + b.position) / 2.0;
            let net_velocity = a.velocity + b.velocity;
            for d in 0..2 {
                assert_abs_diff_eq!(midpoint[d], center[d], epsilon = 1e-9);
                assert_abs_diff_eq!(net_velocity[d], 0.0, epsilon = 1e-12);
            }
        }
    }
}

// ==================================================================================
// Circular orbits
// ==================================================================================

#[test]
fn circular_orbit_closes_after_one_period() {
    let r = 100.0_f64;
    let m = 100.0_f64;
    let period = 2.0 * PI * r * r.sqrt() / (2.0 * m).sqrt();
    let n_steps = 2000;
    let dt = period / n_steps as f64;

    let start = galaxies(0, r, [0.0, 0.0]);
    let speed = start.massive()[0].velocity.length();

    for strategy in [UpdateStrategy::Batch, UpdateStrategy::InPlace] {
        let mut system = start.clone();
        let mut min_sep = f64::MAX;
        let mut max_sep = 0.0_f64;

        for _ in 0..n_steps {
            step_system(&mut system, dt, strategy);
            let [a, b] = system.massive() else {
                panic!("expected two galaxies");
            };
            let sep = a.position.distance(&b.position);
            min_sep = min_sep.min(sep);
            max_sep = max_sep.max(sep);
        }

        assert!(max_sep / r - 1.0 < 0.05, "separation grew to {max_sep}");
        assert!(1.0 - min_sep / r < 0.05, "separation shrank to {min_sep}");

        for (end, begin) in system.massive().iter().zip(start.massive()) {
            assert!(end.position.distance(&begin.position) < 0.05 * r);
            assert_relative_eq!(end.velocity.length(), speed, max_relative = 0.05);
        }
    }
}

#[test]
fn galaxy_energy_is_conserved() {
    let mut system = galaxies(0, 384.0, [0.0, 0.0]);
    let initial = system.total_energy();

    Leapfrog::default().integrate(&mut system, 0.5, 5000);

    let drift = ((system.total_energy() - initial) / initial).abs();
    assert!(drift < 1e-3, "energy drift {drift:.2e}");
}

// ==================================================================================
// Minimum-distance exclusion
// ==================================================================================

#[test]
fn exclusion_floor_is_applied_on_unsquared_distance() {
    let params = FieldParams {
        g: 1.0,
        min_distance: 2.0,
    };

    let inside = acceleration_at(
        &Vector::new([0.0]),
        [(Vector::new([1.0]), 1.0)],
        &params,
        None,
    );
    assert_eq!(inside, Vector::ZERO);

    let on_floor = acceleration_at(
        &Vector::new([0.0]),
        [(Vector::new([2.0]), 1.0)],
        &params,
        None,
    );
    assert_eq!(on_floor, Vector::new([0.25]));

    // Off-axis source well outside the floor
    let s = 4.0 / 2.0_f64.sqrt();
    let diagonal = acceleration_at(
        &Vector::new([1.0, 1.0]),
        [(Vector::new([1.0 + s, 1.0 + s]), 1.0)],
        &params,
        None,
    );
    assert_relative_eq!(diagonal.length(), 1.0 / 16.0, max_relative = 1e-12);
    assert_relative_eq!(diagonal[0], diagonal[1]);
}

#[test]
fn coincident_galaxies_do_not_blow_up() {
    let system = BodySystem::new(
        vec![
            Body::massive(Vector::new([5.0, 5.0]), Vector::ZERO, 100.0),
            Body::massive(Vector::new([5.0, 5.0]), Vector::ZERO, 100.0),
        ],
        vec![Body::tracer(Vector::new([5.0, 5.0]), Vector::ZERO)],
        FieldParams::default(),
    );
    let mut stepped = system.clone();
    step_system(&mut stepped, 1.0, UpdateStrategy::Batch);

    for body in stepped.massive().iter().chain(stepped.tracers()) {
        assert!(body.position.is_finite());
        assert_eq!(body.acceleration, Vector::ZERO);
    }
}

// ==================================================================================
// Tracers never pull
// ==================================================================================

#[test]
fn tracers_do_not_disturb_massive_bodies() {
    let bare = galaxies(0, 384.0, [0.0, 0.0]);

    for n in [1, 50, 400] {
        for strategy in [UpdateStrategy::Batch, UpdateStrategy::InPlace] {
            let mut with_tracers = galaxies(n, 384.0, [0.0, 0.0]);
            let mut without = bare.clone();
            assert_eq!(with_tracers.massive(), without.massive());

            for _ in 0..100 {
                step_system(&mut with_tracers, 0.5, strategy);
                step_system(&mut without, 0.5, strategy);
            }
            assert_eq!(with_tracers.massive(), without.massive());
        }
    }
}

// ==================================================================================
// Batch / in-place agreement
// ==================================================================================

#[test]
fn batch_and_in_place_agree_after_one_step() {
    let start = galaxies(300, 384.0, [640.0, 360.0]);
    let mut batch = start.clone();
    let mut in_place = start;

    step_system(&mut batch, 0.5, UpdateStrategy::Batch);
    step_system(&mut in_place, 0.5, UpdateStrategy::InPlace);

    assert_bodies_close(batch.massive(), in_place.massive(), 1e-9);
    assert_bodies_close(batch.tracers(), in_place.tracers(), 1e-9);
}

#[test]
fn batch_and_in_place_agree_over_many_steps() {
    let start = galaxies(300, 384.0, [640.0, 360.0]);
    let mut batch = start.clone();
    let mut in_place = start.clone();
    let mut evaluated = start;

    for _ in 0..1000 {
        step_system(&mut batch, 0.5, UpdateStrategy::Batch);
        step_system(&mut in_place, 0.5, UpdateStrategy::InPlace);
        step_system_with(&mut evaluated, 0.5, &mut ScalarEvaluator).unwrap();
    }

    assert_bodies_close(batch.massive(), in_place.massive(), 1e-6);
    assert_bodies_close(batch.tracers(), in_place.tracers(), 1e-6);
    assert_bodies_close(batch.massive(), evaluated.massive(), 1e-6);
    assert_bodies_close(batch.tracers(), evaluated.tracers(), 1e-6);
}

// ==================================================================================
// Degenerate input
// ==================================================================================

#[test]
fn zero_dt_leaves_state_unchanged() {
    let start = galaxies(64, 384.0, [0.0, 0.0]);

    for strategy in [UpdateStrategy::Batch, UpdateStrategy::InPlace] {
        let mut system = start.clone();
        step_system(&mut system, 0.0, strategy);
        assert_eq!(system, start);
    }

    let mut system = start.clone();
    step_system_with(&mut system, 0.0, &mut ScalarEvaluator).unwrap();
    assert_eq!(system, start);
}

#[test]
fn empty_systems_step_without_error() {
    let mut empty: BodySystem<2> = BodySystem::new(Vec::new(), Vec::new(), FieldParams::default());
    step_system(&mut empty, 0.5, UpdateStrategy::Batch);
    step_system(&mut empty, 0.5, UpdateStrategy::InPlace);
    step_system_with(&mut empty, 0.5, &mut ScalarEvaluator).unwrap();
    assert_eq!(empty.body_count(), 0);

    let mut no_tracers = galaxies(0, 384.0, [0.0, 0.0]);
    step_system(&mut no_tracers, 0.5, UpdateStrategy::Batch);
    assert!(no_tracers.tracers().is_empty());
}

#[test]
fn tracers_without_galaxies_coast() {
    let tracer = Body::tracer(Vector::new([1.0, 2.0]), Vector::new([0.5, -0.5]));
    let mut system = BodySystem::new(Vec::new(), vec![tracer], FieldParams::default());

    step_system(&mut system, 2.0, UpdateStrategy::InPlace);

    let moved = system.tracers()[0];
    assert_eq!(moved.position, Vector::new([2.0, 1.0]));
    assert_eq!(moved.velocity, tracer.velocity);
    assert_eq!(moved.acceleration, Vector::ZERO);
}

// ==================================================================================
// Other dimensions
// ==================================================================================

#[test]
fn one_dimensional_pair_falls_together() {
    let mut system = BodySystem::new(
        vec![
            Body::massive(Vector::new([-10.0]), Vector::ZERO, 1.0),
            Body::massive(Vector::new([10.0]), Vector::ZERO, 1.0),
        ],
        vec![Body::tracer(Vector::new([40.0]), Vector::ZERO)],
        FieldParams::default(),
    );

    Leapfrog::default().integrate(&mut system, 0.5, 20);

    let [a, b] = system.massive() else {
        panic!("expected two bodies");
    };
    assert!(a.position[0] > -10.0);
    assert_relative_eq!(a.position[0], -b.position[0]);
    assert!(system.tracers()[0].position[0] < 40.0);
}

#[test]
fn three_dimensional_orbit_stays_in_its_plane() {
    let speed = (100.0_f64 * 50.0 / (100.0 * 100.0)).sqrt();
    let mut system = BodySystem::new(
        vec![
            Body::massive(Vector::new([-50.0, 0.0, 0.0]), Vector::new([0.0, 0.0, speed]), 100.0),
            Body::massive(Vector::new([50.0, 0.0, 0.0]), Vector::new([0.0, 0.0, -speed]), 100.0),
        ],
        Vec::new(),
        FieldParams::default(),
    );

    Leapfrog::new(UpdateStrategy::InPlace).integrate(&mut system, 0.5, 1000);

    for body in system.massive() {
        assert_eq!(body.position[1], 0.0);
        assert_relative_eq!(body.position.length(), 50.0, max_relative = 0.01);
    }
}

// ==================================================================================
// Shared evaluator suite
// ==================================================================================

#[test]
fn scalar_evaluator_passes_the_evaluator_suite() {
    let mut evaluator = ScalarEvaluator;
    checks::check_mirror_symmetry(&mut evaluator, Tolerance::F64);
    checks::check_orbit_closure(&mut evaluator);
    checks::check_tracers_do_not_pull(&mut evaluator);
    checks::check_degenerate_input(&mut evaluator, Tolerance::F64);
    checks::check_matches_reference(&mut evaluator, Tolerance::F64);
}
