//! Structure-of-arrays tracer state

use gravity_physics::{
    BatchEvaluator, Error, FieldMode, FieldParams, Result, ScalarEvaluator, Source, Vector,
};
use rand::Rng;

/// Positions, velocities and accelerations of massless bodies, one array each
#[derive(Debug, Clone, PartialEq)]
pub struct TracerState<const D: usize> {
    pub positions: Vec<Vector<D>>,
    pub velocities: Vec<Vector<D>>,
    pub accelerations: Vec<Vector<D>>,
}

impl<const D: usize> TracerState<D> {
    /// Accelerations start at zero
    pub fn new(positions: Vec<Vector<D>>, velocities: Vec<Vector<D>>) -> Result<Self> {
        let accelerations = vec![Vector::ZERO; positions.len()];
        Self::from_parts(positions, velocities, accelerations)
    }

    pub fn from_parts(
        positions: Vec<Vector<D>>,
        velocities: Vec<Vector<D>>,
        accelerations: Vec<Vector<D>>,
    ) -> Result<Self> {
        let state = Self {
            positions,
            velocities,
            accelerations,
        };
        state.validate()?;
        Ok(state)
    }

    /// One velocity and one acceleration per position
    pub fn validate(&self) -> Result<()> {
        let positions = self.positions.len();
        for (name, other) in [
            ("velocities", self.velocities.len()),
            ("accelerations", self.accelerations.len()),
        ] {
            if other != positions {
                return Err(Error::ArrayLength {
                    name,
                    positions,
                    other,
                });
            }
        }
        Ok(())
    }

    /// `size` tracers with every coordinate drawn from `[0, spread)`
    pub fn random<R: Rng + ?Sized>(size: usize, spread: f64, rng: &mut R) -> Self {
        let mut draw = || Vector::new(std::array::from_fn(|_| rng.random::<f64>() * spread));
        let positions: Vec<Vector<D>> = (0..size).map(|_| draw()).collect();
        let velocities: Vec<Vector<D>> = (0..size).map(|_| draw()).collect();
        Self {
            positions,
            velocities,
            accelerations: vec![Vector::ZERO; size],
        }
    }

    /// Replace the accelerations with the field of `sources` at the current positions
    pub fn accelerate(&mut self, sources: &[Source<D>], params: &FieldParams) -> Result<()> {
        self.accelerations =
            ScalarEvaluator.evaluate_batch(&self.positions, sources, params, FieldMode::Passive)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
