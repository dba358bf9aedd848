//! Adam optimizer

use super::clip::Clip;
use super::optimizer::decayed_lr;
use super::serialize::{
    clip_from_config, clip_to_config, get_bool, get_f32, insert_bool, insert_f32,
};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// Adam optimizer (Adaptive Moment Estimation)
///
/// Tracks bias-corrected running means of the gradient and its square. The
/// AMSGrad variant additionally keeps the elementwise maximum of all past
/// second moments and normalizes by that instead, which restores convergence
/// guarantees Adam lacks on some problems.
pub struct Adam {
    lr: f32,
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
    decay: f32,
    amsgrad: bool,
    clip: Clip,
    iterations: u64,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
    vhat: Vec<Option<Array1<f32>>>,
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, beta_1: f32, beta_2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta_1,
            beta_2,
            epsilon,
            decay: 0.0,
            amsgrad: false,
            clip: Clip::default(),
            iterations: 0,
            m: Vec::new(),
            v: Vec::new(),
            vhat: Vec::new(),
        }
    }

    /// Create Adam with default betas and epsilon
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-7)
    }

    /// Enable the AMSGrad variant
    pub fn with_amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
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
        let mut opt = Self::new(
            get_f32(map, "lr", 0.001)?,
            get_f32(map, "beta_1", 0.9)?,
            get_f32(map, "beta_2", 0.999)?,
            get_f32(map, "epsilon", 1e-7)?,
        )
        .with_amsgrad(get_bool(map, "amsgrad", false)?)
        .with_decay(get_f32(map, "decay", 0.0)?);
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.is_empty() {
            self.m = params.iter().map(|_| None).collect();
            self.v = params.iter().map(|_| None).collect();
            self.vhat = params.iter().map(|_| None).collect();
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::default_params(0.001)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params);
        self.clip.apply(params);

        let lr = decayed_lr(self.lr, self.decay, self.iterations);
        let t = self.iterations + 1;
        self.iterations = t;

        // Bias correction folded into the step size
        let lr_t = lr
            * ((1.0 - self.beta_2.powi(t as i32)).sqrt() / (1.0 - self.beta_1.powi(t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else {
                continue;
            };

            // m_t = β1 * m + (1 - β1) * g
            let m_t = if let Some(m) = &self.m[i] {
                m * self.beta_1 + &grad * (1.0 - self.beta_1)
            } else {
                &grad * (1.0 - self.beta_1)
            };

            // v_t = β2 * v + (1 - β2) * g²
            let grad_sq = &grad * &grad;
            let v_t = if let Some(v) = &self.v[i] {
                v * self.beta_2 + &grad_sq * (1.0 - self.beta_2)
            } else {
                &grad_sq * (1.0 - self.beta_2)
            };

            let denom = if self.amsgrad {
                let vhat_t = match &self.vhat[i] {
                    Some(vhat) => ndarray::Zip::from(vhat)
                        .and(&v_t)
                        .map_collect(|&a, &b| a.max(b)),
                    None => v_t.clone(),
                };
                let denom = vhat_t.mapv(f32::sqrt) + self.epsilon;
                self.vhat[i] = Some(vhat_t);
                denom
            } else {
                v_t.mapv(f32::sqrt) + self.epsilon
            };

            let update = &m_t / &denom * lr_t;
            *param.data_mut() = param.data() - &update;

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
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
        "Adam"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "beta_1", self.beta_1);
        insert_f32(&mut map, "beta_2", self.beta_2);
        insert_f32(&mut map, "epsilon", self.epsilon);
        insert_f32(&mut map, "decay", self.decay);
        insert_bool(&mut map, "amsgrad", self.amsgrad);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        let mut out: Vec<Array1<f32>> = self.m.iter().flatten().cloned().collect();
        out.extend(self.v.iter().flatten().cloned());
        Ok(out)
    }
}
