//! Simulation parameters read once at init/reset

use crate::constants::*;
use crate::error::{Error, Result};
use crate::field::FieldParams;

/// Everything needed to seed and step a galaxy system
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of tracers spread over the galaxies
    pub n_tracers: usize,
    /// Timestep per frame. Any finite value is accepted, including zero and
    /// negative steps.
    pub dt: f64,
    /// Gravitational constant
    pub g: f64,
    /// Pairs closer than this contribute no acceleration
    pub min_distance: f64,
    /// Separation of the two galaxies
    pub distance: f64,
    /// Mass of each galaxy
    pub galaxy_mass: f64,
    /// Midpoint between the galaxies
    pub center: [f64; 2],
    /// Tracer orbit radii are drawn from `[annulus_inner, annulus_outer)`
    pub annulus_inner: f64,
    pub annulus_outer: f64,
    /// Fixed seed for reproducible runs; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_tracers: TRACER_COUNT,
            dt: DT,
            g: G,
            min_distance: MIN_DISTANCE,
            distance: GALAXY_DISTANCE,
            galaxy_mass: GALAXY_MASS,
            center: [0.0, 0.0],
            annulus_inner: ANNULUS_INNER,
            annulus_outer: ANNULUS_OUTER,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn field_params(&self) -> FieldParams {
        FieldParams {
            g: self.g,
            min_distance: self.min_distance,
        }
    }

    /// Reject values that would turn the state into NaN/Infinity
    pub fn validate(&self) -> Result<()> {
        validate_dt(self.dt)?;
        if !(self.g.is_finite() && self.g >= 0.0) {
            return invalid(format!("G must be finite and non-negative, got {}", self.g));
        }
        if !(self.min_distance.is_finite() && self.min_distance >= 0.0) {
            return invalid(format!(
                "minimum distance must be finite and non-negative, got {}",
                self.min_distance
            ));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return invalid(format!(
                "galaxy distance must be finite and positive, got {}",
                self.distance
            ));
        }
        if !(self.galaxy_mass.is_finite() && self.galaxy_mass > 0.0) {
            return invalid(format!(
                "galaxy mass must be finite and positive, got {}",
                self.galaxy_mass
            ));
        }
        if !self.center.iter().all(|c| c.is_finite()) {
            return invalid(format!("center must be finite, got {:?}", self.center));
        }
        let annulus_ok = self.annulus_inner.is_finite()
            && self.annulus_outer.is_finite()
            && self.annulus_inner > 0.0
            && self.annulus_outer > self.annulus_inner;
        if !annulus_ok {
            return invalid(format!(
                "annulus must satisfy 0 < inner < outer, got [{}, {})",
                self.annulus_inner, self.annulus_outer
            ));
        }
        Ok(())
    }
}

/// A timestep is valid when it is finite; sign and magnitude are up to the caller
pub fn validate_dt(dt: f64) -> Result<()> {
    if !dt.is_finite() {
        return invalid(format!("dt must be finite, got {dt}"));
    }
    Ok(())
}

fn invalid(message: String) -> Result<()> {
    Err(Error::InvalidConfiguration(message))
}
