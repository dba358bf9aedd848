//! Adamax optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{clip_from_config, clip_to_config, get_f32, insert_f32};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// Adamax optimizer
///
/// The infinity-norm variant of Adam: the second-moment average is replaced
/// by an exponentially-decayed running maximum of gradient magnitudes.
///
/// m_t = β1 * m + (1 - β1) * g
/// u_t = max(β2 * u, |g|)
/// p -= (lr / (1 - β1^t)) * m_t / (u_t + ε)
pub struct Adamax {
    lr: f32,
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
    decay: f32,
    clip: Clip,
    iterations: u64,
    m: Vec<Option<Array1<f32>>>,
    u: Vec<Option<Array1<f32>>>,
}

impl Adamax {
    /// Create a new Adamax optimizer with default betas
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-7,
            decay: 0.0,
            clip: Clip::default(),
            iterations: 0,
            m: Vec::new(),
            u: Vec::new(),
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
        let mut opt = Self::new(get_f32(map, "lr", 0.002)?)
            .with_decay(get_f32(map, "decay", 0.0)?);
        opt.beta_1 = get_f32(map, "beta_1", 0.9)?;
        opt.beta_2 = get_f32(map, "beta_2", 0.999)?;
        opt.epsilon = get_f32(map, "epsilon", 1e-7)?;
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.is_empty() {
            self.m = params.iter().map(|_| None).collect();
            self.u = params.iter().map(|_| None).collect();
        }
    }
}

impl Default for Adamax {
    fn default() -> Self {
        Self::new(0.002)
    }
}

impl Optimizer for Adamax {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params);
        self.clip.apply(params);

        let lr = decayed_lr(self.lr, self.decay, self.iterations);
        let t = self.iterations + 1;
        self.iterations = t;

        let lr_t = lr / (1.0 - self.beta_1.powi(t as i32));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else {
                continue;
            };

            let m_t = if let Some(m) = &self.m[i] {
                m * self.beta_1 + &grad * (1.0 - self.beta_1)
            } else {
                &grad * (1.0 - self.beta_1)
            };

            let grad_abs = grad.mapv(f32::abs);
            let u_t = if let Some(u) = &self.u[i] {
                ndarray::Zip::from(u)
                    .and(&grad_abs)
                    .map_collect(|&u, &g| (u * self.beta_2).max(g))
            } else {
                grad_abs
            };

            let update = &m_t / &(&u_t + self.epsilon) * lr_t;
            *param.data_mut() = param.data() - &update;

            self.m[i] = Some(m_t);
            self.u[i] = Some(u_t);
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
        "Adamax"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "beta_1", self.beta_1);
        insert_f32(&mut map, "beta_2", self.beta_2);
        insert_f32(&mut map, "epsilon", self.epsilon);
        insert_f32(&mut map, "decay", self.decay);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        let mut out: Vec<Array1<f32>> = self.m.iter().flatten().cloned().collect();
        out.extend(self.u.iter().flatten().cloned());
        Ok(out)
    }
}
