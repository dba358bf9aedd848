//! Seeded synthetic classification data
//!
//! Generates the toy dataset the optimizer tests train on: one well-separated
//! cluster per class, plus one-hot label encoding. The same seed always
//! produces the same data.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `num_samples` points of `input_dim` features in `num_classes`
/// clusters, returning the features and the integer class labels
///
/// Class `c` is centered at `±1` per feature (sign alternating with `c + d`)
/// with uniform noise of half-width `noise` around the center, which keeps
/// the classes linearly separable for small `noise`.
pub fn classification_data(
    num_samples: usize,
    input_dim: usize,
    num_classes: usize,
    noise: f32,
    seed: u64,
) -> (Array2<f32>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Array2::<f32>::zeros((num_samples, input_dim));
    let mut labels = Array1::<usize>::zeros(num_samples);

    for i in 0..num_samples {
        let class = rng.gen_range(0..num_classes);
        labels[i] = class;
        for d in 0..input_dim {
            let center = if (class + d) % 2 == 0 { 1.0 } else { -1.0 };
            // gen_range rejects an empty range, so zero noise means no jitter
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..noise)
            } else {
                0.0
            };
            x[[i, d]] = center + jitter;
        }
    }

    (x, labels)
}

/// One-hot encode integer class labels
pub fn to_categorical(labels: &Array1<usize>, num_classes: usize) -> Array2<f32> {
    let mut y = Array2::<f32>::zeros((labels.len(), num_classes));
    for (i, &label) in labels.iter().enumerate() {
        y[[i, label]] = 1.0;
    }
    y
}
