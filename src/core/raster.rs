use ndarray::Array2;

use crate::core::geometry::GeoTransform;

/// One single-band raster as loaded from disk: pixels plus source geometry.
#[derive(Debug, Clone)]
pub struct BandRaster {
    /// Pixel grid, shape (rows, cols)
    pub data: Array2<u16>,
    /// GDAL-order affine transform of the source grid
    pub transform: GeoTransform,
    /// Source CRS (`EPSG:nnnn` when known, WKT otherwise)
    pub crs: String,
}

impl BandRaster {
    pub fn new(data: Array2<u16>, transform: GeoTransform, crs: impl Into<String>) -> Self {
        BandRaster {
            data,
            transform,
            crs: crs.into(),
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Absolute pixel width in CRS units.
    pub fn pixel_width(&self) -> f64 {
        self.transform[1].abs()
    }

    /// Value of the pixel containing `(x, y)`, or `None` outside the grid.
    #[inline]
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<u16> {
        let gt = &self.transform;
        let col = ((x - gt[0]) / gt[1]).floor();
        let row = ((y - gt[3]) / gt[5]).floor();
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (rows, cols) = self.shape();
        let (r, c) = (row as usize, col as usize);
        if r >= rows || c >= cols {
            return None;
        }
        Some(self.data[(r, c)])
    }
}
