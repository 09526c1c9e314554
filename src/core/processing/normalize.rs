//! Cloud-aware radiometric stretch from 16-bit reflectance to 8-bit display.
//!
//! Two regimes share the 16-bit output range: pixels below the cloud cut are
//! stretched over `[256, cloud_divide]`, brighter (cloud/snow) pixels are
//! packed into `[cloud_divide, 65535]`. The cut percentile and the divide both
//! move with the scene's cloud coverage.
//!
//! The constants (`0.75`, `65000`, `100`, floor `256`) are empirical tuning
//! values kept as-is; they are due a calibration review.
use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::CloudCoverage;

/// Lower bound of the clear-sky output range; maps to 8-bit value 1.
pub const CLEAR_FLOOR: f64 = 256.0;
const DIVIDE_BASE: f64 = 65_000.0;
const FULL_SCALE: f64 = u16::MAX as f64;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("No valid pixels (0 < v < 65535) to compute percentiles from")]
    EmptyPopulation,
    #[error("Percentile {0} is outside 0..=100")]
    InvalidPercentile(f64),
}

/// Exact histogram of the pixels strictly between no-data and saturation.
struct ValidHistogram {
    counts: Vec<u64>,
    total: u64,
}

impl ValidHistogram {
    fn from_band(band: &Array2<u16>) -> Self {
        let mut counts = vec![0u64; u16::MAX as usize + 1];
        let mut total = 0u64;
        for &v in band.iter() {
            if v > 0 && v < u16::MAX {
                counts[v as usize] += 1;
                total += 1;
            }
        }
        ValidHistogram { counts, total }
    }

    /// k-th smallest valid value (0-based).
    fn order_statistic(&self, k: u64) -> u16 {
        let mut cumsum = 0u64;
        for (v, &h) in self.counts.iter().enumerate() {
            cumsum += h;
            if k < cumsum {
                return v as u16;
            }
        }
        u16::MAX - 1
    }

    /// Percentile with linear interpolation between closest ranks.
    fn percentile(&self, p: f64) -> Result<f64, NormalizeError> {
        if self.total == 0 {
            return Err(NormalizeError::EmptyPopulation);
        }
        if !(0.0..=100.0).contains(&p) {
            return Err(NormalizeError::InvalidPercentile(p));
        }
        let rank = p / 100.0 * (self.total - 1) as f64;
        let lo = rank.floor() as u64;
        let hi = (lo + 1).min(self.total - 1);
        let frac = rank - lo as f64;
        let a = self.order_statistic(lo) as f64;
        let b = self.order_statistic(hi) as f64;
        Ok(a + (b - a) * frac)
    }
}

/// Linear map of `v` from `[in_lo, in_hi]` to `[out_lo, out_hi]`, clipping
/// the input. A collapsed input range maps to `out_lo`.
#[inline]
fn rescale_intensity(v: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    if in_hi <= in_lo {
        return out_lo;
    }
    let t = (v.clamp(in_lo, in_hi) - in_lo) / (in_hi - in_lo);
    out_lo + t * (out_hi - out_lo)
}

/// Per-band stretch constants derived from the data and the coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchBounds {
    pub low: f64,
    pub cloud_cut: f64,
    pub cloud_divide: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RadiometricStretch {
    coverage: CloudCoverage,
    low_percentile: f64,
}

impl RadiometricStretch {
    pub fn new(coverage: CloudCoverage) -> Self {
        RadiometricStretch {
            coverage,
            low_percentile: 0.0,
        }
    }

    pub fn with_low_percentile(mut self, low_percentile: f64) -> Self {
        self.low_percentile = low_percentile;
        self
    }

    pub fn coverage(&self) -> CloudCoverage {
        self.coverage
    }

    /// Percentile at which the cloud regime starts: `100 - 0.75 * coverage`.
    pub fn cloud_cut_percentile(&self) -> f64 {
        100.0 - self.coverage.percent() * 0.75
    }

    /// Boundary between the two output regimes: `65000 - 100 * coverage`.
    pub fn cloud_divide(&self) -> f64 {
        DIVIDE_BASE - self.coverage.percent() * 100.0
    }

    pub fn bounds(&self, band: &Array2<u16>) -> Result<StretchBounds, NormalizeError> {
        let hist = ValidHistogram::from_band(band);
        Ok(StretchBounds {
            low: hist.percentile(self.low_percentile)?,
            cloud_cut: hist.percentile(self.cloud_cut_percentile())?,
            cloud_divide: self.cloud_divide(),
        })
    }

    /// Stretch a band in the 16-bit domain.
    pub fn stretch(&self, band: &Array2<u16>) -> Result<Array2<u16>, NormalizeError> {
        let b = self.bounds(band)?;
        debug!(
            "Stretch bounds: low={} cloud_cut={} cloud_divide={}",
            b.low, b.cloud_cut, b.cloud_divide
        );

        // The cloud regime rescales from its own extent
        let (mut cloud_min, mut cloud_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in band.iter() {
            let f = v as f64;
            if f >= b.cloud_cut {
                cloud_min = cloud_min.min(f);
                cloud_max = cloud_max.max(f);
            }
        }

        Ok(band.mapv(|v| {
            let f = v as f64;
            if v > 0 && f < b.cloud_cut {
                rescale_intensity(f, b.low, b.cloud_cut, CLEAR_FLOOR, b.cloud_divide) as u16
            } else if f >= b.cloud_cut {
                rescale_intensity(f, cloud_min, cloud_max, b.cloud_divide, FULL_SCALE) as u16
            } else {
                0
            }
        }))
    }

    /// Stretch and convert to 8 bits.
    pub fn normalize(&self, band: &Array2<u16>) -> Result<Array2<u8>, NormalizeError> {
        Ok(to_u8(&self.stretch(band)?))
    }
}

/// Standard 16 → 8 bit intensity conversion: `round(v * 255 / 65535)`.
pub fn to_u8(band: &Array2<u16>) -> Array2<u8> {
    band.mapv(|v| (v as f64 * 255.0 / FULL_SCALE).round() as u8)
}

/// The band-4/band-5 pair feeds index computation; it is never stretched.
pub fn is_index_pair(band_ids: &[String]) -> bool {
    let numbers: Vec<Option<u32>> = band_ids.iter().map(|b| b.trim().parse().ok()).collect();
    numbers == [Some(4), Some(5)]
}

/// Stretched 8-bit bands, or the untouched 16-bit index pair.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedBands {
    U8(Vec<Array2<u8>>),
    U16(Vec<Array2<u16>>),
}

impl NormalizedBands {
    pub fn len(&self) -> usize {
        match self {
            NormalizedBands::U8(b) => b.len(),
            NormalizedBands::U16(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize every band in parallel, or pass the index pair through.
pub fn normalize_bands(
    bands: Vec<Array2<u16>>,
    band_ids: &[String],
    stretch: &RadiometricStretch,
) -> Result<NormalizedBands, NormalizeError> {
    use rayon::prelude::*;

    if is_index_pair(band_ids) {
        info!("Bands {:?} form an index pair; skipping color correction", band_ids);
        return Ok(NormalizedBands::U16(bands));
    }
    info!(
        "Color correcting {} band(s) at {} cloud coverage",
        bands.len(),
        stretch.coverage()
    );
    let out = bands
        .par_iter()
        .map(|band| stretch.normalize(band))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NormalizedBands::U8(out))
}
