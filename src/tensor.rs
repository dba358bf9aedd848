//! Flat parameter vector with gradient storage
//!
//! Layers compute gradients analytically and hand them to the optimizer
//! through this type; there is no tape.

use ndarray::Array1;

/// A 1-D `f32` parameter with an optional gradient
#[derive(Clone, Debug)]
pub struct Tensor {
    data: Array1<f32>,
    grad: Option<Array1<f32>>,
    trainable: bool,
}

impl Tensor {
    /// Create a new tensor with data
    pub fn new(data: Array1<f32>, trainable: bool) -> Self {
        Self {
            data,
            grad: None,
            trainable,
        }
    }

    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, trainable: bool) -> Self {
        Self::new(Array1::from(data), trainable)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(size: usize, trainable: bool) -> Self {
        Self::new(Array1::zeros(size), trainable)
    }

    /// Get reference to data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Get the gradient, if one has been set this step
    pub fn grad(&self) -> Option<&Array1<f32>> {
        self.grad.as_ref()
    }

    /// Set the gradient, replacing any existing one
    pub fn set_grad(&mut self, grad: Array1<f32>) {
        self.grad = Some(grad);
    }

    /// Accumulate into the gradient (for parameters touched by several batches)
    pub fn accumulate_grad(&mut self, grad: Array1<f32>) {
        match self.grad.as_mut() {
            Some(existing) => *existing = &*existing + &grad,
            None => self.grad = Some(grad),
        }
    }

    /// Clear the gradient
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Whether the optimizer should update this parameter
    pub fn trainable(&self) -> bool {
        self.trainable
    }

    /// Get size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
