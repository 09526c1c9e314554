use tracing::{debug, info};

use crate::core::geometry::{
    DestinationGrid, GeoTransform, GeometryError, destination_grid, reference_band_index,
};
use crate::core::processing::normalize::{NormalizedBands, RadiometricStretch, normalize_bands};
use crate::core::processing::pansharpen::fuse;
use crate::core::processing::reproject::reproject_bands;
use crate::core::processing::resize::{resolution_ratio, upscale_band};
use crate::core::raster::BandRaster;
use crate::error::{Error, Result};
use crate::types::{BitDepth, Satellite};

/// A fully processed composite, ready for a writer.
#[derive(Debug, Clone)]
pub struct Composite {
    pub bands: NormalizedBands,
    pub grid: DestinationGrid,
    /// Ids of the bands in `bands`, in order (the pan band is not among them)
    pub band_ids: Vec<String>,
    pub pansharpened: bool,
}

impl Composite {
    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.grid.transform
    }

    pub fn crs(&self) -> &str {
        &self.grid.crs
    }

    pub fn bit_depth(&self) -> BitDepth {
        match self.bands {
            NormalizedBands::U8(_) => BitDepth::U8,
            NormalizedBands::U16(_) => BitDepth::U16,
        }
    }
}

fn same_band(a: &str, b: &str) -> bool {
    a.trim().trim_start_matches('0') == b.trim().trim_start_matches('0')
}

/// Position of the panchromatic band when the request is exactly three
/// visible bands plus the family's pan band and fusion is enabled.
pub fn pan_index(satellite: Satellite, band_ids: &[String], pansharpen: bool) -> Option<usize> {
    if !pansharpen || band_ids.len() != 4 {
        return None;
    }
    let pan = satellite.panchromatic_band()?;
    let mut hits = band_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| same_band(id, pan));
    match (hits.next(), hits.next()) {
        (Some((i, _)), None) => Some(i),
        _ => None,
    }
}

/// Run the composite stages on loaded bands: optional pan upscale,
/// reference grid, reprojection, optional fusion, then the stretch.
pub fn build_composite(
    mut bands: Vec<BandRaster>,
    band_ids: &[String],
    pan: Option<usize>,
    target_crs: &str,
    stretch: &RadiometricStretch,
) -> Result<Composite> {
    if bands.is_empty() {
        return Err(GeometryError::NoBands.into());
    }
    if bands.len() != band_ids.len() {
        return Err(Error::InvalidArgument {
            arg: "bands",
            value: format!("{} rasters for {} band ids", bands.len(), band_ids.len()),
        });
    }
    if let Some(p) = pan {
        if p >= bands.len() || bands.len() != 4 {
            return Err(Error::InvalidArgument {
                arg: "pan index",
                value: p.to_string(),
            });
        }
        let visible = if p == 0 { 1 } else { 0 };
        let factor = resolution_ratio(bands[visible].pixel_width(), bands[p].pixel_width());
        info!("Pansharpening with band {} (upscale x{})", band_ids[p], factor);
        for (i, band) in bands.iter_mut().enumerate() {
            if i != p {
                *band = upscale_band(band, factor).map_err(Error::external)?;
            }
        }
    }

    let reference = reference_band_index(&bands).ok_or(GeometryError::NoBands)?;
    debug!("Reference band: {}", band_ids[reference]);
    let grid = destination_grid(&bands[reference], target_crs)?;
    let mut reprojected = reproject_bands(&bands, &grid)?;
    drop(bands);

    let mut ids = band_ids.to_vec();
    if let Some(p) = pan {
        let pan_band = reprojected.remove(p);
        ids.remove(p);
        reprojected = fuse(reprojected, pan_band)?;
    }

    let normalized = normalize_bands(reprojected, &ids, stretch)?;
    Ok(Composite {
        bands: normalized,
        grid,
        band_ids: ids,
        pansharpened: pan.is_some(),
    })
}
