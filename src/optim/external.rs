//! Wrapper for opaque external update rules

use super::{Optimizer, OptimizerConfig};
use crate::{Error, Result, Tensor};
use ndarray::Array1;

/// An optimizer backed by a foreign update rule
///
/// Wraps an arbitrary closure so code written against [`Optimizer`] can drive
/// it, the way a framework wraps a backend-native optimizer. The wrapper can
/// step, but it cannot introspect the foreign state: [`Optimizer::config`]
/// and [`Optimizer::weights`] return [`Error::Unsupported`], so a model
/// compiled with it trains but cannot be serialized with its optimizer.
pub struct External {
    lr: f32,
    iterations: u64,
    update_fn: Box<dyn FnMut(&mut [Tensor], f32)>,
}

impl External {
    /// Wrap an update rule `(params, lr)`
    pub fn new(lr: f32, update_fn: impl FnMut(&mut [Tensor], f32) + 'static) -> Self {
        Self {
            lr,
            iterations: 0,
            update_fn: Box::new(update_fn),
        }
    }

    /// Wrap a plain gradient-descent rule, for tests and examples
    pub fn gradient_descent(lr: f32) -> Self {
        Self::new(lr, |params, lr| {
            for param in params.iter_mut() {
                if let Some(grad) = param.grad().cloned() {
                    *param.data_mut() = param.data() - &(&grad * lr);
                }
            }
        })
    }
}

impl Optimizer for External {
    fn step(&mut self, params: &mut [Tensor]) {
        (self.update_fn)(params, self.lr);
        self.iterations += 1;
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn iterations(&self) -> u64 {
        self.iterations
    }

    fn name(&self) -> &'static str {
        "External"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        Err(Error::Unsupported(
            "external optimizer does not expose a config".to_string(),
        ))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        Err(Error::Unsupported(
            "external optimizer does not expose its state".to_string(),
        ))
    }
}
