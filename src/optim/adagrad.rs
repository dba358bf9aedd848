//! Adagrad optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{clip_from_config, clip_to_config, get_f32, insert_f32};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// Adagrad optimizer
///
/// Accumulates squared gradients over the whole run, so frequently-updated
/// parameters get ever-smaller effective learning rates:
/// a += g², p -= lr * g / (√a + ε).
pub struct Adagrad {
    lr: f32,
    epsilon: f32,
    decay: f32,
    clip: Clip,
    iterations: u64,
    accumulators: Vec<Option<Array1<f32>>>,
}

impl Adagrad {
    /// Create a new Adagrad optimizer with the default epsilon
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            epsilon: 1e-7,
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
        let mut opt = Self::new(get_f32(map, "lr", 0.01)?)
            .with_decay(get_f32(map, "decay", 0.0)?);
        opt.epsilon = get_f32(map, "epsilon", 1e-7)?;
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_accumulators(&mut self, params: &[Tensor]) {
        if self.accumulators.is_empty() {
            self.accumulators = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Adagrad {
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
                a + &grad_sq
            } else {
                grad_sq
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
        "Adagrad"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "epsilon", self.epsilon);
        insert_f32(&mut map, "decay", self.decay);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        Ok(self.accumulators.iter().flatten().cloned().collect())
    }
}
