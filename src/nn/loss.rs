//! Loss functions and the accuracy metric

use crate::{Error, Result};
use ndarray::Array2;

/// Probability floor keeping log/division away from zero
const EPSILON: f32 = 1e-7;

/// Trait for loss functions over batched predictions
pub trait Loss {
    /// Scalar loss averaged over the batch
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32;

    /// Gradient of the loss with respect to the predictions
    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32>;

    /// Name used when persisting a compiled model
    fn name(&self) -> &'static str;
}

/// Categorical cross-entropy over one-hot targets
///
/// Expects probability rows (softmax output). Predictions are clamped to
/// `[EPSILON, 1]` before the log.
pub struct CategoricalCrossentropy;

impl Loss for CategoricalCrossentropy {
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        let n = predictions.nrows() as f32;
        let mut total = 0.0;
        for (p, t) in predictions.iter().zip(targets.iter()) {
            total -= t * p.max(EPSILON).min(1.0).ln();
        }
        total / n
    }

    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        let n = predictions.nrows() as f32;
        ndarray::Zip::from(predictions)
            .and(targets)
            .map_collect(|&p, &t| -t / p.max(EPSILON).min(1.0) / n)
    }

    fn name(&self) -> &'static str {
        "categorical_crossentropy"
    }
}

/// Mean squared error over all elements
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn loss(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
        let n = predictions.len() as f32;
        predictions
            .iter()
            .zip(targets.iter())
            .map(|(&p, &t)| (p - t) * (p - t))
            .sum::<f32>()
            / n
    }

    fn grad(&self, predictions: &Array2<f32>, targets: &Array2<f32>) -> Array2<f32> {
        let n = predictions.len() as f32;
        ndarray::Zip::from(predictions)
            .and(targets)
            .map_collect(|&p, &t| 2.0 * (p - t) / n)
    }

    fn name(&self) -> &'static str {
        "mse"
    }
}

/// Look up a loss by its persisted name
pub fn loss_from_name(name: &str) -> Result<Box<dyn Loss>> {
    match name {
        "categorical_crossentropy" => Ok(Box::new(CategoricalCrossentropy)),
        "mse" | "mean_squared_error" => Ok(Box::new(MeanSquaredError)),
        other => Err(Error::ConfigError(format!("unknown loss `{other}`"))),
    }
}

/// Fraction of rows where the predicted argmax matches the target argmax
pub fn categorical_accuracy(predictions: &Array2<f32>, targets: &Array2<f32>) -> f32 {
    if predictions.nrows() == 0 {
        return 0.0;
    }

    let argmax = |row: ndarray::ArrayView1<f32>| {
        let mut best = 0;
        for (j, &v) in row.iter().enumerate() {
            if v > row[best] {
                best = j;
            }
        }
        best
    };

    let correct = predictions
        .rows()
        .into_iter()
        .zip(targets.rows())
        .filter(|(p, t)| argmax(p.view()) == argmax(t.view()))
        .count();

    correct as f32 / predictions.nrows() as f32
}
