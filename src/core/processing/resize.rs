use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::Array2;
use tracing::info;

use crate::core::raster::BandRaster;

/// Integer ratio between a coarse and a fine pixel width, at least 1.
pub fn resolution_ratio(coarse_pixel: f64, fine_pixel: f64) -> usize {
    if !(coarse_pixel.is_finite() && fine_pixel.is_finite()) || fine_pixel <= 0.0 {
        return 1;
    }
    let ratio = (coarse_pixel.abs() / fine_pixel.abs()).round();
    if ratio < 1.0 { 1 } else { ratio as usize }
}

pub fn resize_u16_image(
    data: &[u16],
    original_cols: usize,
    original_rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> Result<Vec<u16>, Box<dyn std::error::Error>> {
    let resize_options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();

    // Convert u16 slice into little-endian bytes for fast_image_resize
    let mut src_bytes = Vec::with_capacity(data.len() * 2);
    for &v in data {
        src_bytes.extend_from_slice(&v.to_le_bytes());
    }

    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        src_bytes,
        PixelType::U16,
    )?;
    let mut dst_image = Image::new(target_cols as u32, target_rows as u32, PixelType::U16);
    resizer.resize(&src_image, &mut dst_image, &resize_options)?;

    let dst_bytes = dst_image.into_vec();
    let out = dst_bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    Ok(out)
}

/// Upscale a band by an integer `factor`, keeping its origin and dividing
/// its pixel size so the footprint stays the same.
pub fn upscale_band(
    band: &BandRaster,
    factor: usize,
) -> Result<BandRaster, Box<dyn std::error::Error>> {
    if factor <= 1 {
        return Ok(band.clone());
    }
    let (rows, cols) = band.shape();
    let (new_rows, new_cols) = (rows * factor, cols * factor);
    info!(
        "Rescaling band {}x{} -> {}x{} (x{})",
        cols, rows, new_cols, new_rows, factor
    );

    let src: Vec<u16> = band.data.iter().copied().collect();
    let resized = resize_u16_image(&src, cols, rows, new_cols, new_rows)?;
    let data = Array2::from_shape_vec((new_rows, new_cols), resized)?;

    let mut transform = band.transform;
    transform[1] /= factor as f64;
    transform[5] /= factor as f64;
    Ok(BandRaster::new(data, transform, band.crs.clone()))
}
