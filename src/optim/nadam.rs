//! Nadam optimizer

use super::clip::Clip;
use super::serialize::{clip_from_config, clip_to_config, get_f32, insert_f32};
use super::{Optimizer, OptimizerConfig};
use crate::{Result, Tensor};
use ndarray::Array1;
use serde_json::{Map, Value};

/// Nadam optimizer (Adam with Nesterov momentum)
///
/// Applies the Nesterov trick to Adam's first moment using the momentum
/// schedule μ_t = β1 * (1 - 0.5 * 0.96^(t * schedule_decay)); the effective
/// first moment is a blend of the corrected current gradient and the
/// look-ahead corrected momentum.
pub struct Nadam {
    lr: f32,
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
    schedule_decay: f32,
    clip: Clip,
    iterations: u64,
    m_schedule: f32,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
}

impl Nadam {
    /// Create a new Nadam optimizer
    pub fn new(lr: f32, beta_1: f32, beta_2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta_1,
            beta_2,
            epsilon,
            schedule_decay: 0.004,
            clip: Clip::default(),
            iterations: 0,
            m_schedule: 1.0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Set the momentum schedule decay
    pub fn with_schedule_decay(mut self, schedule_decay: f32) -> Self {
        self.schedule_decay = schedule_decay;
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
            get_f32(map, "lr", 0.002)?,
            get_f32(map, "beta_1", 0.9)?,
            get_f32(map, "beta_2", 0.999)?,
            get_f32(map, "epsilon", 1e-7)?,
        )
        .with_schedule_decay(get_f32(map, "schedule_decay", 0.004)?);
        opt.clip = clip_from_config(map)?;
        Ok(opt)
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.is_empty() {
            self.m = params.iter().map(|_| None).collect();
            self.v = params.iter().map(|_| None).collect();
        }
    }

    fn momentum_cache(&self, t: u64) -> f32 {
        self.beta_1 * (1.0 - 0.5 * 0.96f32.powf(t as f32 * self.schedule_decay))
    }
}

impl Default for Nadam {
    fn default() -> Self {
        Self::new(0.002, 0.9, 0.999, 1e-7)
    }
}

impl Optimizer for Nadam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params);
        self.clip.apply(params);

        let t = self.iterations + 1;
        self.iterations = t;

        let mu_t = self.momentum_cache(t);
        let mu_next = self.momentum_cache(t + 1);
        let m_schedule_new = self.m_schedule * mu_t;
        let m_schedule_next = m_schedule_new * mu_next;
        self.m_schedule = m_schedule_new;

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad().cloned() else {
                continue;
            };

            let g_prime = &grad / (1.0 - m_schedule_new);

            let m_t = if let Some(m) = &self.m[i] {
                m * self.beta_1 + &grad * (1.0 - self.beta_1)
            } else {
                &grad * (1.0 - self.beta_1)
            };
            let m_t_prime = &m_t / (1.0 - m_schedule_next);

            let grad_sq = &grad * &grad;
            let v_t = if let Some(v) = &self.v[i] {
                v * self.beta_2 + &grad_sq * (1.0 - self.beta_2)
            } else {
                &grad_sq * (1.0 - self.beta_2)
            };
            let v_t_prime = &v_t / (1.0 - self.beta_2.powi(t as i32));

            // Nesterov blend of current gradient and look-ahead momentum
            let m_t_bar = &g_prime * (1.0 - mu_t) + &m_t_prime * mu_next;

            let update = &m_t_bar / &(v_t_prime.mapv(f32::sqrt) + self.epsilon) * self.lr;
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
        "Nadam"
    }

    fn config(&self) -> Result<OptimizerConfig> {
        let mut map = Map::new();
        insert_f32(&mut map, "lr", self.lr);
        insert_f32(&mut map, "beta_1", self.beta_1);
        insert_f32(&mut map, "beta_2", self.beta_2);
        insert_f32(&mut map, "epsilon", self.epsilon);
        insert_f32(&mut map, "schedule_decay", self.schedule_decay);
        clip_to_config(&self.clip, &mut map);
        Ok(OptimizerConfig::new(self.name(), map))
    }

    fn weights(&self) -> Result<Vec<Array1<f32>>> {
        let mut out: Vec<Array1<f32>> = self.m.iter().flatten().cloned().collect();
        out.extend(self.v.iter().flatten().cloned());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nadam_quadratic_convergence() {
        let mut params = vec![Tensor::from_vec(vec![3.0, -2.0, 1.0], true)];
        let mut optimizer = Nadam::new(0.05, 0.9, 0.999, 1e-7);

        for _ in 0..200 {
            let grad = params[0].data().mapv(|x| 2.0 * x);
            params[0].set_grad(grad);
            optimizer.step(&mut params);
        }

        for &val in params[0].data().iter() {
            assert!(val.abs() < 0.5, "Value {val} did not converge");
        }
    }

    #[test]
    fn test_nadam_momentum_schedule_increases() {
        let optimizer = Nadam::default();
        // μ_t ramps toward β1 as t grows
        let early = optimizer.momentum_cache(1);
        let late = optimizer.momentum_cache(1000);
        assert!(early < late);
        assert!(late < optimizer.beta_1);
    }

    #[test]
    fn test_nadam_weights_snapshot() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        params[0].set_grad(ndarray::arr1(&[1.0]));

        let mut optimizer = Nadam::default();
        assert!(optimizer.weights().unwrap().is_empty());

        optimizer.step(&mut params);
        // First and second moment per parameter
        assert_eq!(optimizer.weights().unwrap().len(), 2);
    }

    #[test]
    fn test_nadam_moves_against_gradient() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        params[0].set_grad(ndarray::arr1(&[1.0]));

        let mut optimizer = Nadam::default();
        optimizer.step(&mut params);

        assert!(params[0].data()[0] < 1.0);
    }
}
