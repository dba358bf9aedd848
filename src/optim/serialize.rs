//! Optimizer config serialization
//!
//! An optimizer serializes to a `class_name` plus a flat hyperparameter map,
//! and deserializes back through a case-insensitive registry. The round trip
//! `serialize -> deserialize -> serialize` preserves the config key set.

use super::clip::Clip;
use super::{Adadelta, Adagrad, Adam, Adamax, Nadam, Optimizer, RMSprop, SGD};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serialized optimizer: class name plus hyperparameter map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Optimizer class identifier (matched case-insensitively)
    pub class_name: String,

    /// Hyperparameters (`lr`, `decay`, `clipnorm`, ...)
    pub config: Map<String, Value>,
}

impl OptimizerConfig {
    /// Create a config from a class name and hyperparameter map
    pub fn new(class_name: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            class_name: class_name.into(),
            config,
        }
    }

    /// Sorted config keys, for round-trip stability checks
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.config.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Serialize an optimizer into its config representation
pub fn serialize(optimizer: &dyn Optimizer) -> Result<OptimizerConfig> {
    optimizer.config()
}

/// Reconstruct an optimizer from a config
///
/// The `class_name` lookup ignores case, so `"SGD"`, `"sgd"` and `"Sgd"` all
/// resolve to the same optimizer.
pub fn deserialize(config: &OptimizerConfig) -> Result<Box<dyn Optimizer>> {
    let map = &config.config;
    let optimizer: Box<dyn Optimizer> = match config.class_name.to_ascii_lowercase().as_str() {
        "sgd" => Box::new(SGD::from_config(map)?),
        "rmsprop" => Box::new(RMSprop::from_config(map)?),
        "adagrad" => Box::new(Adagrad::from_config(map)?),
        "adadelta" => Box::new(Adadelta::from_config(map)?),
        "adam" => Box::new(Adam::from_config(map)?),
        "adamax" => Box::new(Adamax::from_config(map)?),
        "nadam" => Box::new(Nadam::from_config(map)?),
        other => return Err(Error::UnknownOptimizer(other.to_string())),
    };
    Ok(optimizer)
}

pub(crate) fn get_f32(map: &Map<String, Value>, key: &str, default: f32) -> Result<f32> {
    match map.get(key) {
        Some(v) => v
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| Error::ConfigError(format!("`{key}` must be a number"))),
        None => Ok(default),
    }
}

pub(crate) fn get_bool(map: &Map<String, Value>, key: &str, default: bool) -> Result<bool> {
    match map.get(key) {
        Some(v) => v
            .as_bool()
            .ok_or_else(|| Error::ConfigError(format!("`{key}` must be a boolean"))),
        None => Ok(default),
    }
}

pub(crate) fn insert_f32(map: &mut Map<String, Value>, key: &str, value: f32) {
    map.insert(key.to_string(), Value::from(f64::from(value)));
}

pub(crate) fn insert_bool(map: &mut Map<String, Value>, key: &str, value: bool) {
    map.insert(key.to_string(), Value::from(value));
}

/// Write `clipnorm`/`clipvalue` keys, present only when set
pub(crate) fn clip_to_config(clip: &Clip, map: &mut Map<String, Value>) {
    if let Some(norm) = clip.norm {
        insert_f32(map, "clipnorm", norm);
    }
    if let Some(value) = clip.value {
        insert_f32(map, "clipvalue", value);
    }
}

/// Read `clipnorm`/`clipvalue` keys, absent keys meaning no clipping
pub(crate) fn clip_from_config(map: &Map<String, Value>) -> Result<Clip> {
    let norm = match map.get("clipnorm") {
        Some(v) => Some(
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::ConfigError("`clipnorm` must be a number".to_string()))?,
        ),
        None => None,
    };
    let value = match map.get("clipvalue") {
        Some(v) => Some(
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::ConfigError("`clipvalue` must be a number".to_string()))?,
        ),
        None => None,
    };
    Ok(Clip { norm, value })
}
