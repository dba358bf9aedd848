//! Model saving functionality

use super::format::{ModelFormat, SaveConfig};
use super::model::ModelState;
use crate::nn::Sequential;
use crate::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a model to a file
///
/// # Example
///
/// ```no_run
/// use afinar::io::{save_model, ModelFormat, SaveConfig};
/// use afinar::nn::{Dense, Sequential};
///
/// let mut model = Sequential::new();
/// model.add(Dense::new(2, 1));
///
/// let config = SaveConfig::new(ModelFormat::Json);
/// save_model(&model, "model.json", &config).unwrap();
/// ```
pub fn save_model(model: &Sequential, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();
    let state = ModelState::from_model(
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model"),
        model,
    )?;

    let data = match config.format {
        ModelFormat::Json => {
            if config.pretty {
                serde_json::to_string_pretty(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            } else {
                serde_json::to_string(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            }
        }
        ModelFormat::Yaml => serde_yaml::to_string(&state)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
    };

    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}
