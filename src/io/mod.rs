//! Model I/O - Loading and saving models
//!
//! Persists a [`crate::nn::Sequential`] (architecture, weights, and compiled
//! optimizer/loss configuration) to JSON or YAML, and rebuilds it.

mod format;
mod load;
mod model;
mod save;


pub use format::{ModelFormat, SaveConfig};
pub use load::load_model;
pub use model::ModelState;
pub use save::save_model;
