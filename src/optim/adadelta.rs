//! Adadelta optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{clip_from_config, clip_to_config, get_f32, insert_f32};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// Adadelta optimizer
///
/// Extends Adagrad with a decaying window over past squared gradients and
/// rescales updates by a matching running average of past squared updates,
/// making the method largely insensitive to the nominal learning rate:
///
/// a = rho * a + (1 - rho) * g²
/// Δ = g * √(d + ε) / √(a + ε)
/// p -= lr * Δ
/// d = rho * d + (1 - rho) * Δ²
pub struct Adadelta {
    lr: f32,
    rho: f32,
    epsilon: f32,
    decay: f32,
    clip: Clip,
    iterations: u64,
    accumulators: Vec<Option<Array1<f32>>>,
    delta_accumulators: Vec<Option<Array1<f32>>>,
}

impl Adadelta {
    /// Create a new Adadelta optimizer with the default rho (0.95)
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            rho: 0.95,
            epsilon: 1e-7,
            decay: 0.0,
            clip: Clip::default(),
            iterations: 0,
            accumulators: Vec::new(),
            delta_accumulators: Vec::new(),
        }
    }

    /// Set the averaging factor for squared gradients and updates
    pub fn with_rho(mut self, rho: f32) -> Self {
        self.rho = rho;
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
        let mut opt = Self::new(get_f32(map, "lr", 1.0)?)
            .with_rho(get_f32(map, "rho", 0.95)?)
            .with_decay(get_f32(map, "decay", 0.0)?);
        opt.epsilon = get_f32(map, "epsilon", 1e-7)?;
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_state(&mut self, params: &[Tensor]) {
        if self.accumulators.is_empty() {
            self.accumulators = params.iter().map(|_| None).collect();
            self.delta_accumulators = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Adadelta {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_state(params);
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

            let d_a = self.delta_accumulators[i]
                .take()
                .unwrap_or_else(|| Array1::zeros(grad.len()));

            // Δ = g * √(d + ε) / √(a + ε)
            let update = &grad * &(d_a.mapv(|x| (x + self.epsilon).sqrt()))
                / &(new_a.mapv(|x| (x + self.epsilon).sqrt()));

            *param.data_mut() = param.data() - &(&update * lr);

            let new_d_a = &d_a * self.rho + &(&update * &update) * (1.0 - self.rho);
            self.accumulators[i] = Some(new_a);
            self.delta_accumulators[i] = Some(new_d_a);
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
        "Adadelta"
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
        let mut out: Vec<Array1<f32>> = self.accumulators.iter().flatten().cloned().collect();
        out.extend(self.delta_accumulators.iter().flatten().cloned());
        Ok(out)
    }
}
