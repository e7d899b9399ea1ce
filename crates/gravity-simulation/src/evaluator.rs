//! Batch field evaluation on the GPU

use crate::device::{DeviceContext, DeviceError};
use crate::kernel::{DeviceSession, GravityKernels};
use crate::state::TracerState;
use gravity_physics::{
    check_batch_shape, BatchEvaluator, FieldMode, FieldParams, Result, ScalarEvaluator, Source,
    Vector,
};
use std::sync::Arc;

/// Evaluates whole batches with the `accelerate` kernel
///
/// Each call uploads the targets and sources, dispatches once and reads the
/// accelerations back. Device buffers live only for the duration of the call.
pub struct BatchDeviceEvaluator {
    context: Arc<DeviceContext>,
    kernels: Arc<GravityKernels>,
}

impl BatchDeviceEvaluator {
    /// Fails when the kernels do not build on this device
    pub fn new(context: Arc<DeviceContext>) -> std::result::Result<Self, DeviceError> {
        let kernels = Arc::new(GravityKernels::new(&context.device)?);
        Ok(Self { context, kernels })
    }

    /// Open the default adapter
    pub fn from_default_adapter() -> std::result::Result<Self, DeviceError> {
        Self::new(Arc::new(DeviceContext::blocking()?))
    }

    pub fn context(&self) -> &Arc<DeviceContext> {
        &self.context
    }
}

impl<const D: usize> BatchEvaluator<D> for BatchDeviceEvaluator {
    fn name(&self) -> &'static str {
        "GPU"
    }

    fn evaluate_batch(
        &mut self,
        targets: &[Vector<D>],
        sources: &[Source<D>],
        params: &FieldParams,
        mode: FieldMode,
    ) -> Result<Vec<Vector<D>>> {
        check_batch_shape(targets.len(), sources.len(), mode)?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        if sources.is_empty() {
            return Ok(vec![Vector::ZERO; targets.len()]);
        }

        let state = TracerState::new(targets.to_vec(), vec![Vector::ZERO; targets.len()])?;
        let mut session = DeviceSession::new(
            self.context.clone(),
            self.kernels.clone(),
            &state,
            sources,
            params,
            mode,
        )?;
        session.accelerate()?;
        Ok(session.read_accelerations()?)
    }
}

/// The device evaluator when an adapter is available and the kernels build,
/// the scalar one otherwise
pub fn preferred_evaluator<const D: usize>() -> Box<dyn BatchEvaluator<D>> {
    match BatchDeviceEvaluator::from_default_adapter() {
        Ok(evaluator) => Box::new(evaluator),
        Err(err) => {
            log::warn!("GPU unavailable ({err}), falling back to CPU evaluation");
            Box::new(ScalarEvaluator)
        }
    }
}
