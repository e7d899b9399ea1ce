//! Default constants for the galaxy simulation
//!
//! Units are screen-scale: lengths in pixels, masses and G chosen so the
//! galaxies complete an orbit in a few thousand frames.

/// Gravitational constant in simulation units
pub const G: f64 = 1.0;

/// Pairs closer than this contribute no acceleration to each other
pub const MIN_DISTANCE: f64 = 2.0;

/// Mass of each galaxy core
pub const GALAXY_MASS: f64 = 100.0;

/// Galaxy size for rendering
pub const GALAXY_RADIUS: f64 = 20.0;

/// Tracer size for rendering
pub const TRACER_RADIUS: f64 = 5.0;

/// Separation of the two galaxies (0.3 of a 1280 px wide canvas)
pub const GALAXY_DISTANCE: f64 = 384.0;

/// Inner edge of the annulus tracers are scattered in
pub const ANNULUS_INNER: f64 = 30.0;

/// Outer edge (exclusive) of the tracer annulus
pub const ANNULUS_OUTER: f64 = 330.0;

/// Number of tracers created on init
pub const TRACER_COUNT: usize = 1000;

/// Integration timestep per frame
pub const DT: f64 = 0.5;
