use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::types::OutputFormat;

pub const DEFAULT_TARGET_CRS: &str = "EPSG:3857";

/// Processing parameters suitable for config files and presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    pub format: OutputFormat,
    /// CRS of the composite grid (EPSG code or WKT)
    pub target_crs: String,
    /// Fuse the panchromatic band when the band set includes it
    pub pansharpen: bool,
    /// Lower percentile of the clear-sky stretch
    pub low_percentile: f64,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::TIFF,
            target_crs: DEFAULT_TARGET_CRS.to_string(),
            pansharpen: true,
            low_percentile: 0.0,
        }
    }
}

impl ProcessingParams {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params = serde_json::from_str(&text)?;
        Ok(params)
    }
}
