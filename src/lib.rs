//! # Afinar: Optimizers & Toy Training Surface
//!
//! Afinar provides first-order optimizers (SGD, RMSprop, Adagrad, Adadelta,
//! Adam, Adamax, Nadam) over flat `f32` parameter vectors, together with the
//! minimal model surface needed to exercise them end to end: a sequential
//! dense network with manual backprop, per-parameter constraints, optimizer
//! config serialization, and JSON/YAML model persistence.
//!
//! ## Architecture
//!
//! - **optim**: Optimizers, gradient clipping, config serialize/deserialize
//! - **constraint**: Post-update parameter projections (MaxNorm, NonNeg, ...)
//! - **nn**: Dense layers, activations, losses, `Sequential` with fit/predict
//! - **data**: Seeded synthetic classification data
//! - **io**: Model saving and loading (JSON, YAML formats)

pub mod constraint;
pub mod data;
pub mod io;
pub mod nn;
pub mod optim;

pub mod error;
mod tensor;

// Re-export commonly used types
pub use error::{Error, Result};
pub use tensor::Tensor;
