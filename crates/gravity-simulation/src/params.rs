//! Uniform block shared by the gravity kernels

use bytemuck::{Pod, Zeroable};
use gravity_physics::{FieldMode, FieldParams};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    // x: G, y: min_distance, z: dt, w: padding
    pub constants: [f32; 4],

    // x: target_count, y: source_count, z: dimension, w: exclude_self
    pub counts: [u32; 4],
}

impl KernelParams {
    pub fn new(
        field: &FieldParams,
        target_count: usize,
        source_count: usize,
        dimension: usize,
        mode: FieldMode,
    ) -> Self {
        Self {
            constants: [field.g as f32, field.min_distance as f32, 0.0, 0.0],
            counts: [
                target_count as u32,
                source_count as u32,
                dimension as u32,
                u32::from(mode == FieldMode::SelfConsistent),
            ],
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.constants[2] = dt as f32;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_matches_wgsl_struct() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
    }

    #[test]
    fn self_consistent_mode_sets_exclusion_flag() {
        let params = KernelParams::new(&FieldParams::default(), 3, 3, 2, FieldMode::SelfConsistent)
            .with_dt(0.25);
        assert_eq!(params.counts, [3, 3, 2, 1]);
        assert_eq!(params.constants, [1.0, 2.0, 0.25, 0.0]);

        let passive = KernelParams::new(&FieldParams::default(), 8, 2, 1, FieldMode::Passive);
        assert_eq!(passive.counts[3], 0);
    }
}
