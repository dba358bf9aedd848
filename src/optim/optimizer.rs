//! Optimizer trait

use crate::optim::OptimizerConfig;
use crate::{Result, Tensor};
use ndarray::Array1;

/// Trait for optimization algorithms
///
/// Implementations update parameters in place from the gradients currently
/// stored on them. Parameters without a gradient are skipped; whether an
/// entirely gradient-free step is an error is the caller's decision.
pub trait Optimizer {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Number of steps taken so far
    fn iterations(&self) -> u64;

    /// Identifier used as `class_name` in serialized configs
    fn name(&self) -> &'static str;

    /// Hyperparameter configuration for serialization
    ///
    /// Wrapped external optimizers do not expose one and return
    /// [`crate::Error::Unsupported`].
    fn config(&self) -> Result<OptimizerConfig>;

    /// Snapshot of the optimizer's state buffers (moments, accumulators)
    ///
    /// The default is an empty snapshot; optimizers with inspectable state
    /// override it, wrapped external optimizers return
    /// [`crate::Error::Unsupported`].
    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        Ok(Vec::new())
    }
}

/// Time-based learning rate decay shared by the Keras-style optimizers:
/// `lr * 1 / (1 + decay * iterations)`
pub(crate) fn decayed_lr(lr: f32, decay: f32, iterations: u64) -> f32 {
    if decay > 0.0 {
        lr * (1.0 / (1.0 + decay * iterations as f32))
    } else {
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decayed_lr_no_decay() {
        assert_eq!(decayed_lr(0.1, 0.0, 100), 0.1);
    }

    #[test]
    fn test_decayed_lr_shrinks_over_time() {
        let lr0 = decayed_lr(1.0, 1e-3, 0);
        let lr1 = decayed_lr(1.0, 1e-3, 1000);
        assert_eq!(lr0, 1.0);
        assert!(lr1 < lr0);
        assert!((lr1 - 0.5).abs() < 1e-6);
    }
}
