//! Activation layers

use super::{Layer, LayerSpec};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Supported activation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Relu,
    Softmax,
    Linear,
    /// Rowwise argmax emitted as a single float column. Not differentiable;
    /// backward blocks gradient flow.
    ArgMax,
}

/// Parameterless activation layer
pub struct Activation {
    kind: ActivationKind,
    // relu caches its input mask, softmax its output
    cache: Option<Array2<f32>>,
}

impl Activation {
    pub fn new(kind: ActivationKind) -> Self {
        Self { kind, cache: None }
    }

    pub fn relu() -> Self {
        Self::new(ActivationKind::Relu)
    }

    pub fn softmax() -> Self {
        Self::new(ActivationKind::Softmax)
    }

    pub fn linear() -> Self {
        Self::new(ActivationKind::Linear)
    }

    pub fn argmax() -> Self {
        Self::new(ActivationKind::ArgMax)
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }
}

impl Layer for Activation {
    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        match self.kind {
            ActivationKind::Relu => {
                self.cache = Some(input.clone());
                input.mapv(|x| x.max(0.0))
            }
            ActivationKind::Softmax => {
                let mut out = input.clone();
                for mut row in out.rows_mut() {
                    let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                    row.mapv_inplace(|x| (x - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|x| x / sum);
                }
                self.cache = Some(out.clone());
                out
            }
            ActivationKind::Linear => input.clone(),
            ActivationKind::ArgMax => {
                let mut out = Array2::<f32>::zeros((input.nrows(), 1));
                for (i, row) in input.rows().into_iter().enumerate() {
                    let mut best = 0;
                    for (j, &v) in row.iter().enumerate() {
                        if v > row[best] {
                            best = j;
                        }
                    }
                    out[[i, 0]] = best as f32;
                }
                out
            }
        }
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Option<Array2<f32>> {
        match self.kind {
            ActivationKind::Relu => {
                let input = self.cache.as_ref()?;
                Some(grad_output * &input.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }))
            }
            ActivationKind::Softmax => {
                let output = self.cache.as_ref()?;
                // dz_i = y_i * (g_i - Σ_j g_j y_j), rowwise
                let dot = (grad_output * output).sum_axis(Axis(1));
                let mut grad = Array2::<f32>::zeros(grad_output.raw_dim());
                for (i, mut grow) in grad.rows_mut().into_iter().enumerate() {
                    for j in 0..grow.len() {
                        grow[j] = output[[i, j]] * (grad_output[[i, j]] - dot[i]);
                    }
                }
                Some(grad)
            }
            ActivationKind::Linear => Some(grad_output.clone()),
            ActivationKind::ArgMax => None,
        }
    }

    fn spec(&self) -> LayerSpec {
        LayerSpec::Activation {
            activation: self.kind,
        }
    }
}
