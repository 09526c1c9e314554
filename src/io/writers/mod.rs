//! Composite writers: GeoTIFF (primary), JPEG preview, world/prj files and
//! provenance metadata.
pub mod jpeg;
pub mod metadata;
pub mod tiff;
pub mod worldfile;

use std::path::{Path, PathBuf};

use crate::core::processing::pipeline::Composite;
use crate::types::OutputFormat;

pub use metadata::CompositeMetadata;

/// Write `composite` to `output` in `format`.
pub fn write_composite(
    output: &Path,
    composite: &Composite,
    meta: &CompositeMetadata,
    format: OutputFormat,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match format {
        OutputFormat::TIFF => tiff::write_composite_tiff(output, composite, meta),
        OutputFormat::JPEG => jpeg::write_composite_jpeg(output, composite, meta),
    }
}
