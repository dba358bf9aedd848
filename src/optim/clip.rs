//! Gradient clipping utilities
//!
//! Every optimizer runs its gradients through [`Clip`] before the update:
//! first the global-norm rescale (`clipnorm`), then the elementwise clamp
//! (`clipvalue`).

use crate::Tensor;

/// Clip gradients by global norm
///
/// Computes the global norm over all gradients and scales each gradient by
/// `max_norm / global_norm` when the norm exceeds `max_norm`, preserving the
/// relative magnitudes of gradients across parameters.
///
/// # Returns
/// The global norm before clipping
pub fn clip_grad_norm(params: &mut [Tensor], max_norm: f32) -> f32 {
    let mut total_norm_sq = 0.0;

    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_norm_sq += grad.iter().map(|&g| g * g).sum::<f32>();
        }
    }

    let global_norm = total_norm_sq.sqrt();

    if global_norm > max_norm {
        let clip_coef = max_norm / global_norm;

        for param in params.iter_mut() {
            if let Some(grad) = param.grad() {
                let clipped = grad * clip_coef;
                param.set_grad(clipped);
            }
        }
    }

    global_norm
}

/// Clamp every gradient element into `[-limit, limit]`
pub fn clip_grad_value(params: &mut [Tensor], limit: f32) {
    for param in params.iter_mut() {
        if let Some(grad) = param.grad() {
            let clipped = grad.mapv(|g| g.clamp(-limit, limit));
            param.set_grad(clipped);
        }
    }
}

/// Per-optimizer gradient preprocessing settings
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Clip {
    /// Maximum global gradient norm (None = no norm clipping)
    pub norm: Option<f32>,

    /// Elementwise gradient clamp (None = no value clipping)
    pub value: Option<f32>,
}

impl Clip {
    /// Apply norm clipping, then value clipping, to all gradients
    pub fn apply(&self, params: &mut [Tensor]) {
        if let Some(max_norm) = self.norm {
            clip_grad_norm(params, max_norm);
        }
        if let Some(limit) = self.value {
            clip_grad_value(params, limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clip_grad_norm_no_clipping() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0], true),
        ];

        params[0].set_grad(ndarray::arr1(&[0.1, 0.2]));
        params[1].set_grad(ndarray::arr1(&[0.1]));

        // Global norm = sqrt(0.01 + 0.04 + 0.01) ≈ 0.245
        let global_norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(global_norm, 0.245, epsilon = 1e-3);
        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[1], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(params[1].grad().unwrap()[0], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_with_clipping() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0, 2.0], true),
            Tensor::from_vec(vec![3.0], true),
        ];

        params[0].set_grad(ndarray::arr1(&[3.0, 4.0]));
        params[1].set_grad(ndarray::arr1(&[0.0]));

        // Global norm = sqrt(9 + 16) = 5.0, clip_coef = 0.2
        let global_norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(global_norm, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[1], 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(params[1].grad().unwrap()[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_preserves_relative_magnitudes() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];

        params[0].set_grad(ndarray::arr1(&[10.0]));
        params[1].set_grad(ndarray::arr1(&[5.0]));

        let _ = clip_grad_norm(&mut params, 1.0);

        let g0 = params[0].grad().unwrap()[0];
        let g1 = params[1].grad().unwrap()[0];
        assert_abs_diff_eq!(g0 / g1, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_clip_grad_value() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 1.0, 1.0], true)];
        params[0].set_grad(ndarray::arr1(&[-2.0, 0.3, 7.0]));

        clip_grad_value(&mut params, 0.5);

        let g = params[0].grad().unwrap();
        assert_abs_diff_eq!(g[0], -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(g[1], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(g[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_no_gradients() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], false)];

        let global_norm = clip_grad_norm(&mut params, 1.0);
        assert_abs_diff_eq!(global_norm, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_settings_apply_both() {
        let mut params = vec![Tensor::from_vec(vec![0.0, 0.0], true)];
        params[0].set_grad(ndarray::arr1(&[30.0, 40.0]));

        let clip = Clip {
            norm: Some(5.0),
            value: Some(3.5),
        };
        clip.apply(&mut params);

        // Norm clip scales (30, 40) -> (3, 4), value clip clamps 4 -> 3.5
        let g = params[0].grad().unwrap();
        assert_abs_diff_eq!(g[0], 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(g[1], 3.5, epsilon = 1e-5);
    }
}
