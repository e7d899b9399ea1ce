//! # Gravity Physics
//!
//! Numerical core of the galaxy simulation: pairwise gravitational
//! acceleration with a minimum-distance cutoff, symplectic leapfrog
//! integration, and circular-orbit initial conditions for two galaxies and
//! their massless tracers.

pub mod batch;
pub mod body;
pub mod checks;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod integrator;
pub mod system;
pub mod vector;

pub use batch::*;
pub use body::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use field::*;
pub use integrator::*;
pub use system::*;
pub use vector::*;
