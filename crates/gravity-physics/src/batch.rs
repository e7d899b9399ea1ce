//! Whole-array acceleration evaluation
//!
//! A [`BatchEvaluator`] takes plain arrays in and hands plain arrays back, so
//! the same step can run on the CPU or be shipped to an accelerator.

use crate::error::{Error, Result};
use crate::field::{acceleration_at, FieldMode, FieldParams, Source};
use crate::vector::Vector;

/// Evaluates the field at many targets in one call
pub trait BatchEvaluator<const D: usize> {
    /// Short name used in logs and benchmark reports
    fn name(&self) -> &'static str;

    /// Acceleration at every target, in target order
    ///
    /// In [`FieldMode::SelfConsistent`] target `i` is source `i` and must not
    /// feel itself, so both slices must have the same length.
    fn evaluate_batch(
        &mut self,
        targets: &[Vector<D>],
        sources: &[Source<D>],
        params: &FieldParams,
        mode: FieldMode,
    ) -> Result<Vec<Vector<D>>>;
}

/// Check the shape rules every evaluator shares
pub fn check_batch_shape(targets: usize, sources: usize, mode: FieldMode) -> Result<()> {
    if mode == FieldMode::SelfConsistent && targets != sources {
        return Err(Error::ShapeMismatch { targets, sources });
    }
    Ok(())
}

/// Reference CPU evaluator, one target after another
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarEvaluator;

impl<const D: usize> BatchEvaluator<D> for ScalarEvaluator {
    fn name(&self) -> &'static str {
        "CPU"
    }

    fn evaluate_batch(
        &mut self,
        targets: &[Vector<D>],
        sources: &[Source<D>],
        params: &FieldParams,
        mode: FieldMode,
    ) -> Result<Vec<Vector<D>>> {
        check_batch_shape(targets.len(), sources.len(), mode)?;
        Ok(targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                acceleration_at(
                    target,
                    sources.iter().map(|s| (s.position, s.mass)),
                    params,
                    mode.exclusion(i),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_consistent_batch_rejects_mismatched_lengths() {
        let sources = [Source::new(Vector::new([0.0]), 1.0)];
        let targets = [Vector::new([5.0]), Vector::new([6.0])];
        let err = ScalarEvaluator
            .evaluate_batch(&targets, &sources, &FieldParams::default(), FieldMode::SelfConsistent)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { targets: 2, sources: 1 }));
    }

    #[test]
    fn passive_batch_accepts_any_lengths() {
        let sources = [Source::new(Vector::new([0.0]), 1.0)];
        let targets = [Vector::new([5.0]), Vector::new([-5.0]), Vector::new([1.0])];
        let a = ScalarEvaluator
            .evaluate_batch(&targets, &sources, &FieldParams::default(), FieldMode::Passive)
            .unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a[0][0], -a[1][0]);
        assert_eq!(a[2], Vector::ZERO);
    }

    #[test]
    fn empty_targets_give_empty_result() {
        let a: Vec<Vector<2>> = ScalarEvaluator
            .evaluate_batch(&[], &[], &FieldParams::default(), FieldMode::SelfConsistent)
            .unwrap();
        assert!(a.is_empty());
    }
}
