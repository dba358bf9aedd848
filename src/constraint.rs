//! Per-parameter constraints
//!
//! A constraint projects a parameter vector back into its feasible set after
//! every optimizer update. Layers apply their kernel and bias constraints
//! independently at the end of each training step.

use ndarray::Array1;

/// Trait for post-update parameter projections
pub trait Constraint {
    /// Project a parameter value into the feasible set
    fn apply(&self, w: &Array1<f32>) -> Array1<f32>;
}

/// Any `Fn(&Array1<f32>) -> Array1<f32>` closure is a constraint
impl<F> Constraint for F
where
    F: Fn(&Array1<f32>) -> Array1<f32>,
{
    fn apply(&self, w: &Array1<f32>) -> Array1<f32> {
        self(w)
    }
}

/// Rescale the vector so its L2 norm does not exceed `max_value`
#[derive(Debug, Clone, Copy)]
pub struct MaxNorm {
    pub max_value: f32,
}

impl MaxNorm {
    pub fn new(max_value: f32) -> Self {
        Self { max_value }
    }
}

impl Constraint for MaxNorm {
    fn apply(&self, w: &Array1<f32>) -> Array1<f32> {
        let norm = w.iter().map(|&x| x * x).sum::<f32>().sqrt();
        if norm > self.max_value && norm > 0.0 {
            w * (self.max_value / norm)
        } else {
            w.clone()
        }
    }
}

/// Clamp every element to be non-negative
#[derive(Debug, Clone, Copy)]
pub struct NonNeg;

impl Constraint for NonNeg {
    fn apply(&self, w: &Array1<f32>) -> Array1<f32> {
        w.mapv(|x| x.max(0.0))
    }
}

/// Rescale the vector to unit L2 norm
#[derive(Debug, Clone, Copy)]
pub struct UnitNorm;

impl Constraint for UnitNorm {
    fn apply(&self, w: &Array1<f32>) -> Array1<f32> {
        let norm = w.iter().map(|&x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            w / norm
        } else {
            w.clone()
        }
    }
}

/// Keep the L2 norm inside `[min_value, max_value]`, interpolated by `rate`
///
/// `rate = 1.0` projects strictly onto the interval; smaller rates move the
/// norm only part of the way there on each application.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxNorm {
    pub min_value: f32,
    pub max_value: f32,
    pub rate: f32,
}

impl MinMaxNorm {
    pub fn new(min_value: f32, max_value: f32) -> Self {
        Self {
            min_value,
            max_value,
            rate: 1.0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }
}

impl Constraint for MinMaxNorm {
    fn apply(&self, w: &Array1<f32>) -> Array1<f32> {
        let norm = w.iter().map(|&x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return w.clone();
        }
        let desired = self.rate * norm.clamp(self.min_value, self.max_value)
            + (1.0 - self.rate) * norm;
        w * (desired / norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_max_norm_rescales_large_vectors() {
        let w = ndarray::arr1(&[3.0, 4.0]); // norm 5
        let projected = MaxNorm::new(1.0).apply(&w);

        let norm = projected.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(projected[0] / projected[1], 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_max_norm_keeps_small_vectors() {
        let w = ndarray::arr1(&[0.3, 0.4]);
        let projected = MaxNorm::new(1.0).apply(&w);
        assert_eq!(projected, w);
    }

    #[test]
    fn test_non_neg_clamps_negatives() {
        let w = ndarray::arr1(&[-1.0, 0.5, -0.2]);
        let projected = NonNeg.apply(&w);
        assert_eq!(projected, ndarray::arr1(&[0.0, 0.5, 0.0]));
    }

    #[test]
    fn test_unit_norm() {
        let w = ndarray::arr1(&[3.0, 4.0]);
        let projected = UnitNorm.apply(&w);
        let norm = projected.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_min_max_norm_raises_small_norms() {
        let w = ndarray::arr1(&[0.1, 0.0]);
        let projected = MinMaxNorm::new(1.0, 2.0).apply(&w);
        let norm = projected.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_closure_constraint() {
        let constraint = |w: &Array1<f32>| w.mapv(|x| 0.0 * x + 1.0);
        let projected = constraint.apply(&ndarray::arr1(&[5.0, -3.0]));
        assert_eq!(projected, ndarray::arr1(&[1.0, 1.0]));
    }
}
