use gdal::raster::{Buffer, ColorInterpretation, GdalType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::processing::normalize::NormalizedBands;
use crate::core::processing::pipeline::Composite;
use crate::io::writers::metadata::{CompositeMetadata, embed_tiff_metadata};

/// CRS as WKT. EPSG (and other) definitions are expanded through GDAL;
/// strings that already look like WKT are kept.
pub fn projection_wkt(crs: &str) -> Result<String, Box<dyn std::error::Error>> {
    if crs.contains('[') {
        return Ok(crs.to_string());
    }
    Ok(SpatialRef::from_definition(crs)?.to_wkt()?)
}

fn color_for(index: usize, count: usize) -> ColorInterpretation {
    match (count, index) {
        (3, 0) => ColorInterpretation::RedBand,
        (3, 1) => ColorInterpretation::GreenBand,
        (3, 2) => ColorInterpretation::BlueBand,
        _ => ColorInterpretation::GrayIndex,
    }
}

/// Create a GTiff with one raster band per input array, no-data 0 on each.
pub fn write_bands<T: GdalType + Copy>(
    output: &Path,
    cols: usize,
    rows: usize,
    bands: &[Array2<T>],
) -> Result<Dataset, Box<dyn std::error::Error>> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type::<T, _>(output, cols, rows, bands.len())?;
    for (i, data) in bands.iter().enumerate() {
        if data.dim() != (rows, cols) {
            return Err(format!(
                "band {} is {:?}, expected {:?}",
                i + 1,
                data.dim(),
                (rows, cols)
            )
            .into());
        }
        let mut band = ds.rasterband(i + 1)?;
        band.set_no_data_value(Some(0.0))?;
        band.set_color_interpretation(color_for(i, bands.len()))?;
        let mut buf = Buffer::new((cols, rows), data.iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buf)?;
        debug!("Wrote band {} of {}", i + 1, bands.len());
    }
    Ok(ds)
}

/// Write the composite as a georeferenced GeoTIFF.
///
/// GDAL writes into a hidden sibling file that is renamed onto `output`
/// only after the dataset is closed; on failure the sibling is removed and
/// nothing appears at `output`.
pub fn write_composite_tiff(
    output: &Path,
    composite: &Composite,
    meta: &CompositeMetadata,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let wkt = projection_wkt(composite.crs())?;

    let temp = tempfile::Builder::new()
        .prefix(".composite-")
        .suffix(".tif")
        .tempfile_in(&parent)?
        .into_temp_path();

    let (cols, rows) = (composite.cols(), composite.rows());
    let mut ds = match &composite.bands {
        NormalizedBands::U8(bands) => write_bands(&temp, cols, rows, bands)?,
        NormalizedBands::U16(bands) => write_bands(&temp, cols, rows, bands)?,
    };
    ds.set_geo_transform(composite.transform())?;
    ds.set_projection(&wkt)?;
    embed_tiff_metadata(&mut ds, meta)?;
    drop(ds);

    temp.persist(output)?;
    info!(
        "Wrote {}-band {:?} composite to {:?}",
        composite.bands.len(),
        composite.bit_depth(),
        output
    );
    Ok(output.to_path_buf())
}
