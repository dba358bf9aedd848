//! Optimizers for training neural networks

mod adadelta;
mod adagrad;
mod adam;
mod adamax;
mod clip;
mod external;
mod nadam;
mod optimizer;
mod rmsprop;
mod serialize;
mod sgd;


pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use adamax::Adamax;
pub use clip::{clip_grad_norm, clip_grad_value, Clip};
pub use external::External;
pub use nadam::Nadam;
pub use optimizer::Optimizer;
pub use rmsprop::RMSprop;
pub use serialize::{deserialize, serialize, OptimizerConfig};
pub use sgd::SGD;
