//! Massive bodies, tracers and their initial conditions

use crate::body::Body;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::field::{
    circular_velocity, AccelerationEvaluator, FieldParams, PassiveField, SelfConsistentField,
};
use crate::vector::Vector;
use glam::DVec2;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, TAU};

/// Galaxies (mutually interacting) plus tracers (pulled, never pulling)
#[derive(Debug, Clone, PartialEq)]
pub struct BodySystem<const D: usize> {
    pub(crate) massive: Vec<Body<D>>,
    pub(crate) tracers: Vec<Body<D>>,
    pub(crate) params: FieldParams,
}

impl<const D: usize> BodySystem<D> {
    /// Assemble a system and evaluate every body's initial acceleration, so
    /// the first step never kicks with a stale value.
    pub fn new(massive: Vec<Body<D>>, tracers: Vec<Body<D>>, params: FieldParams) -> Self {
        let mut system = Self {
            massive,
            tracers,
            params,
        };
        system.refresh_accelerations();
        system
    }

    fn refresh_accelerations(&mut self) {
        let accelerations: Vec<Vector<D>> = {
            let field = SelfConsistentField::new(&self.massive, self.params);
            self.massive
                .iter()
                .enumerate()
                .map(|(i, b)| field.evaluate(i, &b.position))
                .collect()
        };
        for (body, a) in self.massive.iter_mut().zip(accelerations) {
            body.acceleration = a;
        }

        let field = PassiveField::new(&self.massive, self.params);
        for (i, tracer) in self.tracers.iter_mut().enumerate() {
            tracer.acceleration = field.evaluate(i, &tracer.position);
        }
    }

    pub fn massive(&self) -> &[Body<D>] {
        &self.massive
    }

    pub fn tracers(&self) -> &[Body<D>] {
        &self.tracers
    }

    pub fn params(&self) -> FieldParams {
        self.params
    }

    pub fn body_count(&self) -> usize {
        self.massive.len() + self.tracers.len()
    }

    /// Kinetic energy of the massive bodies (tracers carry no mass)
    pub fn kinetic_energy(&self) -> f64 {
        self.massive.iter().map(Body::kinetic_energy).sum()
    }

    /// Pairwise potential energy of the massive bodies
    ///
    /// Pairs inside the minimum distance are left out, matching the field.
    pub fn potential_energy(&self) -> f64 {
        let mut energy = 0.0;
        for (i, a) in self.massive.iter().enumerate() {
            for b in &self.massive[i + 1..] {
                let dist = a.position.distance(&b.position);
                if dist < self.params.min_distance {
                    continue;
                }
                energy -= self.params.g * a.mass * b.mass / dist;
            }
        }
        energy
    }

    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    /// Mass-weighted mean position of the massive bodies
    pub fn center_of_mass(&self) -> Option<Vector<D>> {
        let total: f64 = self.massive.iter().map(|b| b.mass).sum();
        if total <= 0.0 {
            return None;
        }
        let weighted = self
            .massive
            .iter()
            .fold(Vector::ZERO, |acc, b| acc + b.position * b.mass);
        Some(weighted / total)
    }
}

impl BodySystem<2> {
    /// Two galaxies on a circular mutual orbit with tracers around them
    ///
    /// The galaxies sit at `center ∓ distance/2` on the x axis. Each moves
    /// along y at `sqrt(G·m·(d/2) / d²)`, the first upwards and the second
    /// downwards.
    pub fn galaxy_pair<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let center = DVec2::from_array(config.center);
        let offset = DVec2::new(config.distance / 2.0, 0.0);
        let mass = config.galaxy_mass;
        let speed = (config.g * mass * (config.distance / 2.0)
            / (config.distance * config.distance))
            .sqrt();
        log::debug!("Galaxy orbital speed: {speed:.4}");

        let galaxies: Vec<Body<2>> = vec![
            Body::massive((center - offset).into(), DVec2::new(0.0, speed).into(), mass),
            Body::massive((center + offset).into(), DVec2::new(0.0, -speed).into(), mass),
        ];
        let tracers = seed_tracers(
            &galaxies,
            config.n_tracers,
            (config.annulus_inner, config.annulus_outer),
            config.g,
            rng,
        );

        log::info!(
            "Seeded {} galaxies and {} tracers",
            galaxies.len(),
            tracers.len()
        );
        Ok(Self::new(galaxies, tracers, config.field_params()))
    }
}

/// Scatter `count` tracers on circular orbits around `hosts`
///
/// Tracer `i` orbits `hosts[i % hosts.len()]` at a uniform angle and a radius
/// uniform in `annulus`, moving with the host on top of its own orbital
/// velocity.
pub fn seed_tracers<R: Rng + ?Sized>(
    hosts: &[Body<2>],
    count: usize,
    annulus: (f64, f64),
    g: f64,
    rng: &mut R,
) -> Vec<Body<2>> {
    if hosts.is_empty() {
        if count > 0 {
            log::warn!("No massive bodies to host {count} tracers");
        }
        return Vec::new();
    }

    (0..count)
        .map(|i| {
            let host = &hosts[i % hosts.len()];
            let angle = rng.random::<f64>() * TAU;
            let radius = rng.random_range(annulus.0..annulus.1);

            let position = DVec2::from(host.position) + DVec2::from_angle(angle) * radius;
            let speed = circular_velocity(&position.into(), host, g);
            let velocity =
                DVec2::from_angle(angle - FRAC_PI_2) * speed + DVec2::from(host.velocity);

            Body::tracer(position.into(), velocity.into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(n_tracers: usize) -> SimulationConfig {
        SimulationConfig {
            n_tracers,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn galaxies_are_placed_symmetrically() {
        let config = SimulationConfig {
            center: [640.0, 360.0],
            ..config(0)
        };
        let system = BodySystem::galaxy_pair(&config, &mut StdRng::seed_from_u64(1)).unwrap();
        let [a, b] = system.massive() else {
            panic!("expected two galaxies");
        };

        assert_eq!(a.position, Vector::new([640.0 - 192.0, 360.0]));
        assert_eq!(b.position, Vector::new([640.0 + 192.0, 360.0]));
        assert_eq!(a.velocity, -b.velocity);
        assert_relative_eq!(a.velocity[1], (100.0_f64 / (2.0 * 384.0)).sqrt());
        assert_eq!(system.center_of_mass(), Some(Vector::new([640.0, 360.0])));
    }

    #[test]
    fn initial_accelerations_are_evaluated() {
        let system = BodySystem::galaxy_pair(&config(10), &mut StdRng::seed_from_u64(2)).unwrap();
        let [a, b] = system.massive() else {
            panic!("expected two galaxies");
        };
        assert_relative_eq!(a.acceleration[0], 100.0 / (384.0 * 384.0));
        assert_eq!(a.acceleration, -b.acceleration);
        assert!(system
            .tracers()
            .iter()
            .all(|t| t.acceleration != Vector::ZERO));
    }

    #[test]
    fn tracers_are_assigned_round_robin_inside_the_annulus() {
        let system = BodySystem::galaxy_pair(&config(101), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(system.tracers().len(), 101);

        for (i, tracer) in system.tracers().iter().enumerate() {
            let host = &system.massive()[i % 2];
            let r = tracer.position.distance(&host.position);
            assert!((30.0..330.0).contains(&r), "tracer {i} at radius {r}");
            assert_eq!(tracer.mass, 0.0);
        }
    }

    #[test]
    fn tracer_velocity_is_tangential_in_host_frame() {
        let system = BodySystem::galaxy_pair(&config(40), &mut StdRng::seed_from_u64(4)).unwrap();
        for (i, tracer) in system.tracers().iter().enumerate() {
            let host = &system.massive()[i % 2];
            let radial = tracer.position - host.position;
            let relative = tracer.velocity - host.velocity;

            assert!(radial.dot(&relative).abs() < 1e-9 * radial.length() * relative.length());
            assert_relative_eq!(
                relative.length(),
                (100.0 / radial.length()).sqrt(),
                max_relative = 1e-12
            );
            // Clockwise in screen coordinates, matching the galaxy spin
            let cross = radial[0] * relative[1] - radial[1] * relative[0];
            assert!(cross < 0.0);
        }
    }

    #[test]
    fn same_seed_gives_same_system() {
        let a = BodySystem::galaxy_pair(&config(25), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = BodySystem::galaxy_pair(&config(25), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_config_is_rejected_before_seeding() {
        let config = SimulationConfig {
            g: f64::NAN,
            ..config(5)
        };
        assert!(BodySystem::galaxy_pair(&config, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn hostless_tracers_are_dropped() {
        let tracers = seed_tracers(&[], 12, (30.0, 330.0), 1.0, &mut StdRng::seed_from_u64(0));
        assert!(tracers.is_empty());
    }

    #[test]
    fn potential_energy_of_a_pair() {
        let system = BodySystem::new(
            vec![
                Body::massive(Vector::new([0.0]), Vector::ZERO, 2.0),
                Body::massive(Vector::new([4.0]), Vector::ZERO, 3.0),
            ],
            Vec::new(),
            FieldParams::default(),
        );
        assert_relative_eq!(system.potential_energy(), -1.5);
    }
}
