//! Model loading functionality

use super::format::ModelFormat;
use super::model::ModelState;
use crate::nn::Sequential;
use crate::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load a model from a file
///
/// The format is detected from the file extension. The returned model has
/// the saved weights and, if the saved model was compiled, a freshly
/// deserialized optimizer and loss.
///
/// # Example
///
/// ```no_run
/// use afinar::io::load_model;
///
/// let model = load_model("model.json").unwrap();
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<Sequential> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("file has no extension".to_string()))?;

    let format = ModelFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("unsupported file extension: {ext}")))?;

    let mut content = String::new();
    File::open(path)?.read_to_string(&mut content)?;

    let state: ModelState = match format {
        ModelFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?,
        ModelFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?,
    };

    state.into_model()
}
