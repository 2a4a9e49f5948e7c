//! External inputs to a report: the model configuration and image size.

use crate::consts::MODEL_CONFIG_FILE;
use crate::report::ReportError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A model's configuration, as stored in its `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub source: PathBuf,
    pub config: Value,
}

impl ModelConfig {
    /// `path` may be the config file itself or a model directory holding `config.json`.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let source = if path.is_dir() {
            path.join(MODEL_CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        let content =
            std::fs::read_to_string(&source).map_err(|e| ReportError::ModelConfigRead {
                path: source.clone(),
                reason: e.to_string(),
            })?;
        let config =
            serde_json::from_str(&content).map_err(|e| ReportError::ModelConfigParse {
                path: source.clone(),
                reason: e.to_string(),
            })?;

        log::info!("Loaded model configuration from {}", source.display());
        Ok(Self { source, config })
    }

    /// Pretty JSON, keys in file order.
    pub fn render(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }
}

/// Image dimensions as `(width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for ImageSize {
    type Err = ReportError;

    /// Accepts `640x480` or `640X480`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::InvalidImageSize(s.to_string());
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.width, self.height)
    }
}

impl Serialize for ImageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.width, self.height].serialize(serializer)
    }
}
