//! Fully-connected layer

use super::{Layer, LayerSpec};
use crate::constraint::Constraint;
use crate::Tensor;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

// Gives each layer its own deterministic init stream
static INIT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Dense (fully-connected) layer
///
/// Weights are stored flattened row-major as `[input_dim, units]` so the
/// optimizer sees a single 1-D parameter per matrix. Kernel and bias
/// constraints, when set, are applied after every optimizer step.
pub struct Dense {
    input_dim: usize,
    units: usize,
    weights: Tensor,
    bias: Tensor,
    kernel_constraint: Option<Box<dyn Constraint>>,
    bias_constraint: Option<Box<dyn Constraint>>,
    input_cache: Option<Array2<f32>>,
}

impl Dense {
    /// Create a layer with Glorot-uniform weights and zero bias
    pub fn new(input_dim: usize, units: usize) -> Self {
        let seed = 0x5EED_BA5E ^ INIT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::seeded(input_dim, units, seed)
    }

    /// Create a layer with an explicit init seed
    pub fn seeded(input_dim: usize, units: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let limit = (6.0 / (input_dim + units) as f32).sqrt();
        let weights: Vec<f32> = (0..input_dim * units)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Self {
            input_dim,
            units,
            weights: Tensor::from_vec(weights, true),
            bias: Tensor::zeros(units, true),
            kernel_constraint: None,
            bias_constraint: None,
            input_cache: None,
        }
    }

    /// Constrain the weight matrix after every update
    pub fn with_kernel_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.kernel_constraint = Some(Box::new(constraint));
        self
    }

    /// Constrain the bias after every update
    pub fn with_bias_constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.bias_constraint = Some(Box::new(constraint));
        self
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Current weight matrix and bias, flattened
    pub fn get_weights(&self) -> (Array1<f32>, Array1<f32>) {
        (self.weights.data().clone(), self.bias.data().clone())
    }

    fn weight_matrix(&self) -> Array2<f32> {
        self.weights
            .data()
            .clone()
            .into_shape((self.input_dim, self.units))
            .expect("weight length is input_dim * units")
    }
}

impl Layer for Dense {
    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        self.input_cache = Some(input.clone());
        input.dot(&self.weight_matrix()) + self.bias.data()
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Option<Array2<f32>> {
        let input = self.input_cache.as_ref()?;

        // dW = xᵀ g, flattened in the same row-major layout as the weights
        let dw = input.t().dot(grad_output);
        let dw_flat = Array1::from_iter(dw.iter().cloned());
        self.weights.accumulate_grad(dw_flat);

        let db = grad_output.sum_axis(Axis(0));
        self.bias.accumulate_grad(db);

        Some(grad_output.dot(&self.weight_matrix().t()))
    }

    fn params(&self) -> Vec<&Tensor> {
        vec![&self.weights, &self.bias]
    }

    fn params_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weights, &mut self.bias]
    }

    fn num_params(&self) -> usize {
        2
    }

    fn take_params(&mut self) -> Vec<Tensor> {
        vec![
            std::mem::replace(&mut self.weights, Tensor::zeros(0, true)),
            std::mem::replace(&mut self.bias, Tensor::zeros(0, true)),
        ]
    }

    fn put_params(&mut self, params: Vec<Tensor>) {
        let mut iter = params.into_iter();
        self.weights = iter.next().expect("dense layer takes two params");
        self.bias = iter.next().expect("dense layer takes two params");
    }

    fn apply_constraints(&mut self) {
        if let Some(constraint) = &self.kernel_constraint {
            let projected = constraint.apply(self.weights.data());
            *self.weights.data_mut() = projected;
        }
        if let Some(constraint) = &self.bias_constraint {
            let projected = constraint.apply(self.bias.data());
            *self.bias.data_mut() = projected;
        }
    }

    fn spec(&self) -> LayerSpec {
        LayerSpec::Dense {
            input_dim: self.input_dim,
            units: self.units,
        }
    }
}
