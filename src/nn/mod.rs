//! Toy sequential model
//!
//! Just enough network to train optimizers against: dense layers over
//! flattened weights, a few activations, categorical cross-entropy and MSE
//! losses, and a `Sequential` container with a Keras-shaped surface
//! (`compile` / `fit` / `train_on_batch` / `predict` / `evaluate`).

mod activation;
mod dense;
mod loss;
mod sequential;

pub use activation::{Activation, ActivationKind};
pub use dense::Dense;
pub use loss::{
    categorical_accuracy, loss_from_name, CategoricalCrossentropy, Loss, MeanSquaredError,
};
pub use sequential::{History, Sequential};

use crate::Tensor;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A layer in a [`Sequential`] model
pub trait Layer {
    /// Compute the layer output, caching whatever backward needs
    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32>;

    /// Propagate the output gradient, storing parameter gradients on the way
    ///
    /// Returns the gradient with respect to the layer input, or `None` when
    /// the layer blocks gradient flow (non-differentiable ops).
    fn backward(&mut self, grad_output: &Array2<f32>) -> Option<Array2<f32>>;

    /// Read-only references to this layer's parameters
    fn params(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable references to this layer's parameters
    fn params_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Number of parameter tensors this layer owns
    fn num_params(&self) -> usize {
        0
    }

    /// Move the parameters out for an optimizer step
    fn take_params(&mut self) -> Vec<Tensor> {
        Vec::new()
    }

    /// Move the parameters back after an optimizer step, in `take_params`
    /// order
    fn put_params(&mut self, _params: Vec<Tensor>) {}

    /// Apply the layer's constraints to its parameters
    fn apply_constraints(&mut self) {}

    /// Serializable description of this layer
    fn spec(&self) -> LayerSpec;
}

/// Serializable layer description, enough to rebuild the architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Dense { input_dim: usize, units: usize },
    Activation { activation: ActivationKind },
}

/// Rebuild a layer from its spec (constraints are not persisted)
pub fn build_layer(spec: &LayerSpec) -> Box<dyn Layer> {
    match spec {
        LayerSpec::Dense { input_dim, units } => Box::new(Dense::new(*input_dim, *units)),
        LayerSpec::Activation { activation } => Box::new(Activation::new(*activation)),
    }
}
