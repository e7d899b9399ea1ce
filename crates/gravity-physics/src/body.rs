//! Body state shared by galaxies and tracers

use crate::constants::{GALAXY_RADIUS, TRACER_RADIUS};
use crate::vector::Vector;

/// A point mass advanced by the leapfrog integrator
///
/// Bodies carry no identity; the owning [`BodySystem`](crate::BodySystem)
/// decides whether a body is a force source (massive) or a tracer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body<const D: usize> {
    pub position: Vector<D>,
    pub velocity: Vector<D>,
    /// Acceleration at `position`, cached from the last field evaluation
    pub acceleration: Vector<D>,
    pub mass: f64,
    /// Size for rendering
    pub radius: f64,
}

impl<const D: usize> Body<D> {
    /// Create a massive body. The acceleration is filled in when the body
    /// joins a system.
    pub fn massive(position: Vector<D>, velocity: Vector<D>, mass: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vector::ZERO,
            mass,
            radius: GALAXY_RADIUS,
        }
    }

    /// Create a massless tracer
    pub fn tracer(position: Vector<D>, velocity: Vector<D>) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vector::ZERO,
            mass: 0.0,
            radius: TRACER_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
    }

    pub fn momentum(&self) -> Vector<D> {
        self.velocity * self.mass
    }
}
