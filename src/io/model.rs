//! Serializable model state

use crate::nn::{build_layer, loss_from_name, LayerSpec, Sequential};
use crate::optim::{self, OptimizerConfig};
use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Everything needed to rebuild a [`Sequential`]: architecture, weights, and
/// the compiled loss/optimizer configuration
///
/// Optimizer state buffers and layer constraints are not persisted; a loaded
/// model trains from fresh optimizer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model name/identifier
    pub name: String,

    /// Layer descriptions, in order
    pub layers: Vec<LayerSpec>,

    /// Flattened parameter values, in layer order
    pub weights: Vec<Vec<f32>>,

    /// Compiled loss name, if the model was compiled
    pub loss: Option<String>,

    /// Compiled optimizer config, if the model was compiled
    pub optimizer: Option<OptimizerConfig>,
}

impl ModelState {
    /// Capture a model's state
    ///
    /// Fails with [`Error::Unsupported`] when the model was compiled with an
    /// optimizer that cannot be serialized (a wrapped external optimizer).
    pub fn from_model(name: impl Into<String>, model: &Sequential) -> Result<Self> {
        let optimizer = match model.optimizer() {
            Some(opt) => Some(optim::serialize(opt)?),
            None => None,
        };

        Ok(Self {
            name: name.into(),
            layers: model.layer_specs(),
            weights: model.get_weights().iter().map(|w| w.to_vec()).collect(),
            loss: model.loss_name().map(String::from),
            optimizer,
        })
    }

    /// Rebuild the model this state was captured from
    pub fn into_model(self) -> Result<Sequential> {
        let mut model = Sequential::new();
        for spec in &self.layers {
            model.add_boxed(build_layer(spec));
        }

        model.set_weights(self.weights.into_iter().map(Array1::from).collect())?;

        match (self.loss, self.optimizer) {
            (Some(loss), Some(optimizer)) => {
                model.compile_boxed(optim::deserialize(&optimizer)?, loss_from_name(&loss)?);
            }
            (None, None) => {}
            _ => {
                return Err(Error::Serialization(
                    "model state has a loss without an optimizer, or vice versa".to_string(),
                ));
            }
        }

        Ok(model)
    }
}
