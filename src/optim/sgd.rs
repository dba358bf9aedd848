//! Stochastic Gradient Descent optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{
    clip_from_config, clip_to_config, get_bool, get_f32, insert_bool, insert_f32,
};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// SGD optimizer with optional momentum, Nesterov momentum and lr decay
pub struct SGD {
    lr: f32,
    momentum: f32,
    nesterov: bool,
    decay: f32,
    clip: Clip,
    iterations: u64,
    velocities: Vec<Option<Array1<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            nesterov: false,
            decay: 0.0,
            clip: Clip::default(),
            iterations: 0,
            velocities: Vec::new(),
        }
    }

    /// Enable Nesterov momentum
    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    /// Set time-based learning rate decay
    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    /// Clip gradients by global norm before each step
    pub fn with_clipnorm(mut self, clipnorm: f32) -> Self {
        self.clip.norm = Some(clipnorm);
        self
    }

    /// Clamp gradient elements before each step
    pub fn with_clipvalue(mut self, clipvalue: f32) -> Self {
        self.clip.value = Some(clipvalue);
        self
    }

    /// Rebuild from a serialized hyperparameter map
    pub fn from_config(map: &Map<String, Value>) -> Result<Self> {
        let mut sgd = Self::new(get_f32(map, "lr", 0.01)?, get_f32(map, "momentum", 0.0)?)
            .with_nesterov(get_bool(map, "nesterov", false)?)
            .with_decay(get_f32(map, "decay", 0.0)?);
        sgd.clip = clip_from_config(map)?;
        Ok(sgd)
    }

    fn ensure_velocities(&mut self, params: &[Tensor]) {
        if self.velocities.is_empty() {
            self.velocities = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_velocities(params);
        self.clip.apply(params);

        let lr = decayed_lr(self.lr, self.decay, self.iterations);
        self.iterations += 1;

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else {
                continue;
            };

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                let velocity = if let Some(v) = &self.velocities[i] {
                    v * self.momentum - &grad * lr
                } else {
                    &grad * (-lr)
                };

                if self.nesterov {
                    *param.data_mut() = param.data() + &(&velocity * self.momentum - &grad * lr);
                } else {
                    *param.data_mut() = param.data() + &velocity;
                }
                self.velocities[i] = Some(velocity);
            } else {
                // Plain SGD: param -= lr * grad
                *param.data_mut() = param.data() - &(&grad * lr);
            }
        }
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
        "SGD"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "momentum", self.momentum);
        insert_bool(&mut map, "nesterov", self.nesterov);
        insert_f32(&mut map, "decay", self.decay);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        Ok(self
            .velocities
            .iter()
            .flatten()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sgd_plain_step() {
        let mut params = vec![Tensor::from_vec(vec![1.0, -2.0], true)];
        params[0].set_grad(ndarray::arr1(&[0.5, -0.5]));

        let mut optimizer = SGD::new(0.1, 0.0);
        optimizer.step(&mut params);

        assert_abs_diff_eq!(params[0].data()[0], 0.95, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].data()[1], -1.95, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_momentum_accumulates() {
        let mut params = vec![Tensor::from_vec(vec![0.0], true)];
        let mut optimizer = SGD::new(0.1, 0.9);

        // Constant gradient; the second step should move further than the first
        params[0].set_grad(ndarray::arr1(&[1.0]));
        optimizer.step(&mut params);
        let after_first = params[0].data()[0];

        params[0].set_grad(ndarray::arr1(&[1.0]));
        optimizer.step(&mut params);
        let after_second = params[0].data()[0];

        assert_abs_diff_eq!(after_first, -0.1, epsilon = 1e-6);
        assert!((after_second - after_first).abs() > after_first.abs());
    }

    #[test]
    fn test_sgd_nesterov_step() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        params[0].set_grad(ndarray::arr1(&[1.0]));

        let mut optimizer = SGD::new(0.1, 0.9).with_nesterov(true);
        optimizer.step(&mut params);

        // v = -lr*g = -0.1; p += momentum*v - lr*g = 0.9*(-0.1) - 0.1
        assert_abs_diff_eq!(params[0].data()[0], 1.0 - 0.19, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_decay_shrinks_steps() {
        let mut params = vec![Tensor::from_vec(vec![10.0], true)];
        let mut optimizer = SGD::new(0.1, 0.0).with_decay(1.0);

        params[0].set_grad(ndarray::arr1(&[1.0]));
        optimizer.step(&mut params);
        let first_step = 10.0 - params[0].data()[0];

        let before = params[0].data()[0];
        params[0].set_grad(ndarray::arr1(&[1.0]));
        optimizer.step(&mut params);
        let second_step = before - params[0].data()[0];

        assert_abs_diff_eq!(first_step, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(second_step, 0.05, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_skips_params_without_grad() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut optimizer = SGD::new(0.1, 0.0);

        optimizer.step(&mut params);
        assert_abs_diff_eq!(params[0].data()[0], 1.0, epsilon = 1e-6);
    }
}
