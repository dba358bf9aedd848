//! Sequential model container

use super::loss::{categorical_accuracy, Loss};
use super::{Layer, LayerSpec};
use crate::optim::Optimizer;
use crate::{Error, Result, Tensor};
use ndarray::{s, Array1, Array2};

/// Per-epoch training metrics returned by [`Sequential::fit`]
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Average training loss per epoch
    pub loss: Vec<f32>,

    /// Average training accuracy per epoch
    pub accuracy: Vec<f32>,
}

/// A linear stack of layers with a Keras-shaped training surface
///
/// Build with [`add`](Self::add), then [`compile`](Self::compile) with an
/// optimizer and loss before training.
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Box<dyn Optimizer>>,
    loss: Option<Box<dyn Loss>>,
    verbose: bool,
}

impl Sequential {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            optimizer: None,
            loss: None,
            verbose: false,
        }
    }

    /// Append a layer
    pub fn add(&mut self, layer: impl Layer + 'static) {
        self.layers.push(Box::new(layer));
    }

    /// Append an already-boxed layer
    pub fn add_boxed(&mut self, layer: Box<dyn Layer>) {
        self.layers.push(layer);
    }

    /// Attach an optimizer and loss, making the model trainable
    pub fn compile(&mut self, optimizer: impl Optimizer + 'static, loss: impl Loss + 'static) {
        self.compile_boxed(Box::new(optimizer), Box::new(loss));
    }

    /// [`compile`](Self::compile) for trait objects
    pub fn compile_boxed(&mut self, optimizer: Box<dyn Optimizer>, loss: Box<dyn Loss>) {
        self.optimizer = Some(optimizer);
        self.loss = Some(loss);
    }

    /// Print a progress line per epoch during `fit`
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// The compiled optimizer, if any
    pub fn optimizer(&self) -> Option<&dyn Optimizer> {
        self.optimizer.as_deref()
    }

    /// The compiled loss name, if any
    pub fn loss_name(&self) -> Option<&'static str> {
        self.loss.as_ref().map(|l| l.name())
    }

    /// Serializable layer descriptions
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        self.layers.iter().map(|l| l.spec()).collect()
    }

    /// Forward pass through all layers
    pub fn predict(&mut self, x: &Array2<f32>) -> Array2<f32> {
        self.forward(x)
    }

    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let mut out = x.clone();
        for layer in &mut self.layers {
            out = layer.forward(&out);
        }
        out
    }

    /// All parameter values, in layer order
    pub fn get_weights(&self) -> Vec<Array1<f32>> {
        let mut weights = Vec::new();
        for layer in &self.layers {
            for param in layer.params() {
                weights.push(param.data().clone());
            }
        }
        weights
    }

    /// Overwrite all parameter values, in layer order
    pub fn set_weights(&mut self, weights: Vec<Array1<f32>>) -> Result<()> {
        let mut params: Vec<&mut Tensor> = Vec::new();
        for layer in &mut self.layers {
            params.extend(layer.params_mut());
        }

        if params.len() != weights.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![params.len()],
                got: vec![weights.len()],
            });
        }

        for (param, value) in params.into_iter().zip(weights) {
            if param.len() != value.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![param.len()],
                    got: vec![value.len()],
                });
            }
            *param.data_mut() = value;
        }
        Ok(())
    }

    /// Run one optimization step on a single batch
    ///
    /// Returns `(loss, accuracy)` computed on the batch before the update.
    pub fn train_on_batch(&mut self, x: &Array2<f32>, y: &Array2<f32>) -> Result<(f32, f32)> {
        if self.optimizer.is_none() || self.loss.is_none() {
            return Err(Error::ConfigError(
                "model must be compiled before training".to_string(),
            ));
        }

        for layer in &mut self.layers {
            for param in layer.params_mut() {
                param.zero_grad();
            }
        }

        let predictions = self.forward(x);
        if predictions.dim() != y.dim() {
            return Err(Error::ShapeMismatch {
                expected: vec![predictions.nrows(), predictions.ncols()],
                got: vec![y.nrows(), y.ncols()],
            });
        }

        let (loss_val, accuracy, mut grad) = match self.loss.as_ref() {
            Some(loss_fn) => (
                loss_fn.loss(&predictions, y),
                categorical_accuracy(&predictions, y),
                Some(loss_fn.grad(&predictions, y)),
            ),
            None => {
                return Err(Error::ConfigError(
                    "model must be compiled before training".to_string(),
                ))
            }
        };

        for layer in self.layers.iter_mut().rev() {
            let Some(g) = grad else { break };
            grad = layer.backward(&g);
        }

        let mut trainable = 0usize;
        let mut with_grad = 0usize;
        for layer in &mut self.layers {
            for param in layer.params_mut() {
                if param.trainable() {
                    trainable += 1;
                    if param.grad().is_some() {
                        with_grad += 1;
                    }
                }
            }
        }
        if trainable > 0 && with_grad == 0 {
            return Err(Error::NullGradient(
                "an operation blocked gradient flow to every trainable parameter".to_string(),
            ));
        }

        // Pool the parameters so the optimizer sees one flat list, then hand
        // them back and enforce constraints.
        let mut params: Vec<Tensor> = Vec::new();
        for layer in &mut self.layers {
            params.extend(layer.take_params());
        }
        if let Some(optimizer) = self.optimizer.as_mut() {
            optimizer.step(&mut params);
        }
        let mut returned = params.into_iter();
        for layer in &mut self.layers {
            let n = layer.num_params();
            layer.put_params(returned.by_ref().take(n).collect());
        }
        for layer in &mut self.layers {
            layer.apply_constraints();
        }

        Ok((loss_val, accuracy))
    }

    /// Train for `epochs` passes over the data in `batch_size` chunks
    pub fn fit(
        &mut self,
        x: &Array2<f32>,
        y: &Array2<f32>,
        epochs: usize,
        batch_size: usize,
    ) -> Result<History> {
        if x.nrows() != y.nrows() {
            return Err(Error::ShapeMismatch {
                expected: vec![x.nrows()],
                got: vec![y.nrows()],
            });
        }
        if batch_size == 0 {
            return Err(Error::InvalidParameter("batch_size must be > 0".to_string()));
        }
        if x.nrows() == 0 {
            return Err(Error::InvalidParameter(
                "cannot fit on an empty dataset".to_string(),
            ));
        }

        let n = x.nrows();
        let mut history = History::default();

        for epoch in 0..epochs {
            let mut total_loss = 0.0;
            let mut total_acc = 0.0;
            let mut batches = 0usize;

            for start in (0..n).step_by(batch_size) {
                let end = (start + batch_size).min(n);
                let xb = x.slice(s![start..end, ..]).to_owned();
                let yb = y.slice(s![start..end, ..]).to_owned();

                let (loss, acc) = self.train_on_batch(&xb, &yb)?;
                total_loss += loss;
                total_acc += acc;
                batches += 1;
            }

            let avg_loss = total_loss / batches as f32;
            let avg_acc = total_acc / batches as f32;
            history.loss.push(avg_loss);
            history.accuracy.push(avg_acc);

            if self.verbose {
                println!(
                    "Epoch {}/{}: loss={:.4}, accuracy={:.4}",
                    epoch + 1,
                    epochs,
                    avg_loss,
                    avg_acc
                );
            }
        }

        Ok(history)
    }

    /// Compute `(loss, accuracy)` without updating weights
    pub fn evaluate(&mut self, x: &Array2<f32>, y: &Array2<f32>) -> Result<(f32, f32)> {
        let predictions = self.forward(x);
        match self.loss.as_ref() {
            Some(loss_fn) => Ok((
                loss_fn.loss(&predictions, y),
                categorical_accuracy(&predictions, y),
            )),
            None => Err(Error::ConfigError("model must be compiled".to_string())),
        }
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}
