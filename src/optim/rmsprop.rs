//! RMSprop optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{clip_from_config, clip_to_config, get_f32, insert_f32};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// RMSprop optimizer
///
/// Divides the gradient by a running rho-weighted average of its recent
/// magnitude: a = rho * a + (1 - rho) * g², p -= lr * g / (√a + ε).
pub struct RMSprop {
    lr: f32,
    rho: f32,
    epsilon: f32,
    decay: f32,
    clip: Clip,
    iterations: u64,
    accumulators: Vec<Option<Array1<f32>>>,
}

impl RMSprop {
    /// Create a new RMSprop optimizer
    pub fn new(lr: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            lr,
            rho,
            epsilon,
            decay: 0.0,
            clip: Clip::default(),
            iterations: 0,
            accumulators: Vec::new(),
        }
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
        let mut opt = Self::new(
            get_f32(map, "lr", 0.001)?,
            get_f32(map, "rho", 0.9)?,
            get_f32(map, "epsilon", 1e-7)?,
        )
        .with_decay(get_f32(map, "decay", 0.0)?);
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_accumulators(&mut self, params: &[Tensor]) {
        if self.accumulators.is_empty() {
            self.accumulators = params.iter().map(|_| None).collect();
        }
    }
}

impl Default for RMSprop {
    fn default() -> Self {
        Self::new(0.001, 0.9, 1e-7)
    }
}

impl Optimizer for RMSprop {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_accumulators(params);
        self.clip.apply(params);

        let lr = decayed_lr(self.lr, self.decay, self.iterations);
        self.iterations += 1;

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else {
                continue;
            };

            let grad_sq = &grad * &grad;
            let new_a = if let Some(a) = &self.accumulators[i] {
                a * self.rho + &grad_sq * (1.0 - self.rho)
            } else {
                &grad_sq * (1.0 - self.rho)
            };

            let update = &grad / &(new_a.mapv(f32::sqrt) + self.epsilon) * lr;
            *param.data_mut() = param.data() - &update;

            self.accumulators[i] = Some(new_a);
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
        "RMSprop"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "rho", self.rho);
        insert_f32(&mut map, "epsilon", self.epsilon);
        insert_f32(&mut map, "decay", self.decay);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        Ok(self.accumulators.iter().flatten().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rmsprop_first_step_magnitude() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        params[0].set_grad(ndarray::arr1(&[2.0]));

        let mut optimizer = RMSprop::new(0.01, 0.9, 1e-7);
        optimizer.step(&mut params);

        // a = 0.1 * 4 = 0.4, step = lr * 2 / sqrt(0.4) ≈ 0.0316
        assert_abs_diff_eq!(params[0].data()[0], 1.0 - 0.0316, epsilon = 1e-3);
    }

    #[test]
    fn test_rmsprop_quadratic_convergence() {
        let mut params = vec![Tensor::from_vec(vec![2.0, -1.5], true)];
        let mut optimizer = RMSprop::new(0.05, 0.9, 1e-7);

        for _ in 0..200 {
            let grad = params[0].data().mapv(|x| 2.0 * x);
            params[0].set_grad(grad);
            optimizer.step(&mut params);
        }

        for &val in params[0].data().iter() {
            assert!(val.abs() < 0.1, "Value {val} did not converge");
        }
    }

    #[test]
    fn test_rmsprop_weights_snapshot() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        params[0].set_grad(ndarray::arr1(&[0.1, 0.1]));

        let mut optimizer = RMSprop::default();
        assert!(optimizer.weights().unwrap().is_empty());

        optimizer.step(&mut params);
        // One squared-gradient accumulator per parameter
        assert_eq!(optimizer.weights().unwrap().len(), 1);
    }

    #[test]
    fn test_rmsprop_config_defaults() {
        let config = RMSprop::default().config().unwrap();
        assert_eq!(config.class_name, "RMSprop");
        assert!((config.config["rho"].as_f64().unwrap() - 0.9).abs() < 1e-7);
        assert!((config.config["decay"].as_f64().unwrap()).abs() < 1e-12);
    }
}
