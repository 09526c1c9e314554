//! High-level, ergonomic library API: composite a scene to a file or to
//! in-memory bands, and batch helpers for directories of scenes. Prefer these
//! entrypoints over the low-level processing modules when integrating satcomp.
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::params::ProcessingParams;
use crate::core::processing::normalize::{RadiometricStretch, is_index_pair};
use crate::core::processing::pipeline::pan_index;
use crate::error::{Error, Result};
use crate::io::writers::write_composite;
use crate::io::{SceneLayout, load_bands, read_cloud_coverage};
use crate::types::{CloudCoverage, CoverageSummary, OutputFormat, Satellite};

pub use crate::core::processing::pipeline::{Composite, build_composite};
pub use crate::io::writers::CompositeMetadata;

/// Result of in-memory compositing
#[derive(Debug, Clone)]
pub struct SceneComposite {
    pub composite: Composite,
    pub coverage: CloudCoverage,
    pub metadata: CompositeMetadata,
}

fn check_request(bands: &[String], params: &ProcessingParams) -> Result<()> {
    if params.format == OutputFormat::JPEG && is_index_pair(bands) {
        return Err(Error::InvalidArgument {
            arg: "format",
            value: "JPEG cannot hold the 16-bit index pair".to_string(),
        });
    }
    Ok(())
}

/// Load and composite a scene without touching the output directory.
///
/// The sidecar is parsed while the bands load; both must succeed.
pub fn compose_scene_to_buffer(
    layout: &SceneLayout,
    bands: &[String],
    params: &ProcessingParams,
) -> Result<SceneComposite> {
    layout.validate_bands(bands)?;
    check_request(bands, params)?;

    let (meta_path, sidecar) = layout.metadata_source();
    let paths = layout.band_paths(bands);
    info!(
        "Compositing {} {} bands {:?}",
        layout.satellite, layout.scene_id, bands
    );
    let (coverage, loaded) = rayon::join(
        || read_cloud_coverage(&meta_path, sidecar),
        || load_bands(&paths),
    );
    let coverage = coverage?;
    let loaded = loaded?;

    let pan = pan_index(layout.satellite, bands, params.pansharpen);
    let stretch = RadiometricStretch::new(coverage).with_low_percentile(params.low_percentile);
    let composite = build_composite(loaded, bands, pan, &params.target_crs, &stretch)?;
    let metadata = CompositeMetadata::new(&layout.scene_id, layout.satellite, coverage, &composite);
    Ok(SceneComposite {
        composite,
        coverage,
        metadata,
    })
}

/// Composite a scene and write it to `output`.
pub fn compose_scene_to_path(
    layout: &SceneLayout,
    bands: &[String],
    output: &Path,
    params: &ProcessingParams,
) -> Result<(PathBuf, CloudCoverage)> {
    let scene = compose_scene_to_buffer(layout, bands, params)?;
    let written = write_composite(output, &scene.composite, &scene.metadata, params.format)
        .map_err(|e| Error::write(output, e))?;
    Ok((written, scene.coverage))
}

/// Composite a scene into `<scene_dir>/processed/` and return the file path.
pub fn compose_scene(
    layout: &SceneLayout,
    bands: &[String],
    params: &ProcessingParams,
) -> Result<PathBuf> {
    layout.ensure_processed_dir()?;
    let output = layout.output_path(bands, params.format);
    let (written, _) = compose_scene_to_path(layout, bands, &output, params)?;
    Ok(written)
}

/// Batch processing report
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub outputs: Vec<PathBuf>,
    /// Min/max cloud coverage over the processed scenes
    pub coverage: Option<CoverageSummary>,
}

/// Immediate subdirectories of `root` (candidate scenes), sorted by name.
pub fn iterate_scene_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Composite every scene directory under `root` (directory name = scene id).
/// Directories whose family cannot be determined are skipped.
/// If `continue_on_error` is true, failures are counted and processing continues;
/// otherwise, the first error is returned.
pub fn compose_directory(
    root: &Path,
    satellite: Option<Satellite>,
    bands: &[String],
    params: &ProcessingParams,
    continue_on_error: bool,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut coverages = Vec::new();

    for dir in iterate_scene_dirs(root)? {
        let layout = match satellite {
            Some(s) => {
                let name = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                SceneLayout::new(&dir, name, s)
            }
            None => match SceneLayout::from_scene_dir(&dir) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!("Skipping {:?}: {}", dir, e);
                    report.skipped += 1;
                    continue;
                }
            },
        };

        let result = layout.ensure_processed_dir().and_then(|_| {
            let output = layout.output_path(bands, params.format);
            compose_scene_to_path(&layout, bands, &output, params)
        });
        match result {
            Ok((output, coverage)) => {
                report.processed += 1;
                report.outputs.push(output);
                coverages.push(coverage);
            }
            Err(e) => {
                report.errors += 1;
                if !continue_on_error {
                    return Err(e);
                }
                warn!("Error compositing {}: {}", layout.scene_id, e);
            }
        }
    }

    report.coverage = CoverageSummary::fold(coverages);
    Ok(report)
}
