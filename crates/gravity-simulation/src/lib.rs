//! # Gravity Simulation
//!
//! Frame loop around the physics core, wgpu compute kernels for batch field
//! evaluation, and the CPU vs GPU benchmark.

pub mod bench;
pub mod device;
pub mod driver;
pub mod evaluator;
pub mod kernel;
pub mod params;
pub mod state;

pub use bench::*;
pub use device::*;
pub use driver::*;
pub use evaluator::*;
pub use kernel::*;
pub use params::*;
pub use state::*;
