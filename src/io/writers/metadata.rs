use gdal::Dataset;
use gdal::Metadata;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::geometry::GeoTransform;
use crate::core::processing::pipeline::Composite;
use crate::types::{CloudCoverage, Satellite};

pub const CONVERSION_TOOL: &str = "satcomp";

/// Provenance of a composite, embedded as GeoTIFF tags or written as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeMetadata {
    pub scene_id: String,
    pub satellite: Satellite,
    pub bands: Vec<String>,
    pub cloud_coverage: f64,
    pub pansharpened: bool,
    pub crs: String,
    pub geotransform: GeoTransform,
    pub conversion_tool: String,
    pub conversion_version: String,
    pub conversion_timestamp: String,
}

impl CompositeMetadata {
    pub fn new(
        scene_id: &str,
        satellite: Satellite,
        coverage: CloudCoverage,
        composite: &Composite,
    ) -> Self {
        CompositeMetadata {
            scene_id: scene_id.to_string(),
            satellite,
            bands: composite.band_ids.clone(),
            cloud_coverage: coverage.percent(),
            pansharpened: composite.pansharpened,
            crs: composite.crs().to_string(),
            geotransform: *composite.transform(),
            conversion_tool: CONVERSION_TOOL.to_string(),
            conversion_version: env!("CARGO_PKG_VERSION").to_string(),
            conversion_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Flat `KEY -> value` tags for the GeoTIFF default metadata domain.
    pub fn tags(&self) -> HashMap<String, String> {
        let mut tags = HashMap::new();
        tags.insert("SCENE_ID".to_string(), self.scene_id.clone());
        tags.insert("SATELLITE".to_string(), self.satellite.to_string());
        tags.insert("BANDS".to_string(), self.bands.join(","));
        tags.insert("CLOUD_COVERAGE".to_string(), self.cloud_coverage.to_string());
        tags.insert("PANSHARPENED".to_string(), self.pansharpened.to_string());
        tags.insert("CONVERSION_TOOL".to_string(), self.conversion_tool.clone());
        tags.insert(
            "CONVERSION_VERSION".to_string(),
            self.conversion_version.clone(),
        );
        tags.insert(
            "CONVERSION_TIMESTAMP".to_string(),
            self.conversion_timestamp.clone(),
        );
        tags
    }
}

/// Set the provenance tags on an open dataset.
pub fn embed_tiff_metadata(
    ds: &mut Dataset,
    meta: &CompositeMetadata,
) -> Result<(), Box<dyn std::error::Error>> {
    for (key, value) in meta.tags() {
        ds.set_metadata_item(&key, &value, "")?;
    }
    Ok(())
}

/// Write `<output>.json` beside a preview image.
pub fn write_json_sidecar(
    output_path: &Path,
    meta: &CompositeMetadata,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let sidecar_path = output_path.with_extension("json");
    let json_string = serde_json::to_string_pretty(meta)?;
    std::fs::write(&sidecar_path, json_string)?;
    info!("Created metadata sidecar: {:?}", sidecar_path);
    Ok(sidecar_path)
}
