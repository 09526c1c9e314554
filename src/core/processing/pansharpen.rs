use ndarray::{Array2, Zip};
use tracing::info;

use crate::error::{Error, Result};

fn check_shape(what: &str, expected: (usize, usize), got: (usize, usize)) -> Result<()> {
    if expected != got {
        return Err(Error::ShapeMismatch {
            what: what.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// Per-pixel sharpening ratio `pan / (b0 + b1 + b2)`; a zero sum gives 0.
pub fn pan_ratio(visible: &[Array2<u16>], pan: &Array2<u16>) -> Result<Array2<f64>> {
    if visible.len() != 3 {
        return Err(Error::InvalidArgument {
            arg: "visible bands",
            value: visible.len().to_string(),
        });
    }
    let dim = pan.dim();
    for band in visible {
        check_shape("visible band", dim, band.dim())?;
    }

    info!("Calculating pan ratio");
    let mut ratio = Array2::<f64>::zeros(dim);
    Zip::from(&mut ratio)
        .and(&visible[0])
        .and(&visible[1])
        .and(&visible[2])
        .and(pan)
        .par_for_each(|r, &b0, &b1, &b2, &p| {
            let sum = b0 as u32 + b1 as u32 + b2 as u32;
            *r = if sum == 0 { 0.0 } else { p as f64 / sum as f64 };
        });
    Ok(ratio)
}

/// Multiply each visible band by the pan ratio, rounding and saturating to u16.
pub fn apply_ratio(band: &mut Array2<u16>, ratio: &Array2<f64>) -> Result<()> {
    check_shape("pan ratio", band.dim(), ratio.dim())?;
    Zip::from(band).and(ratio).par_for_each(|v, &r| {
        *v = (*v as f64 * r).round().clamp(0.0, u16::MAX as f64) as u16;
    });
    Ok(())
}

/// Sharpen three reprojected visible bands with a reprojected pan band.
/// The pan band is consumed; the output keeps the visible bands' order.
pub fn fuse(mut visible: Vec<Array2<u16>>, pan: Array2<u16>) -> Result<Vec<Array2<u16>>> {
    let ratio = pan_ratio(&visible, &pan)?;
    drop(pan);
    for band in visible.iter_mut() {
        apply_ratio(band, &ratio)?;
    }
    Ok(visible)
}
