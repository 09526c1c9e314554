//! Destination grid computation.
//!
//! The four corners of a reference band are pushed through the CRS
//! transform and their envelope becomes the north-up destination grid. Source
//! grids are axis-aligned, so corner sampling is enough; rotated inputs are
//! rejected up front.
use thiserror::Error;
use tracing::debug;

use crate::core::projection::{PointTransform, transform_between};
use crate::core::raster::BandRaster;

/// GDAL-order affine transform: `[origin_x, px_w, rot_x, origin_y, rot_y, px_h]`.
pub type GeoTransform = [f64; 6];

/// Errors raised while deriving the destination grid
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Coordinate transform error: {0}")]
    Transform(#[from] gdal::errors::GdalError),
    #[error("Source transform has rotation terms ({0}, {1}); only axis-aligned grids are supported")]
    Rotated(f64, f64),
    #[error("Reprojected corner {corner} is not finite: ({x}, {y})")]
    NonFiniteCorner { corner: &'static str, x: f64, y: f64 },
    #[error("Degenerate destination grid: pixel size {width} x {height}")]
    DegenerateExtent { width: f64, height: f64 },
    #[error("Output shape must be non-empty, got {0}x{1}")]
    EmptyShape(usize, usize),
    #[error("Coordinate batch length mismatch: {0} x values, {1} y values")]
    CoordinateCount(usize, usize),
    #[error("No bands supplied")]
    NoBands,
}

/// One corner in source and destination coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub source: (f64, f64),
    pub destination: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCorners {
    pub upper_left: Corner,
    pub upper_right: Corner,
    pub lower_left: Corner,
    pub lower_right: Corner,
}

impl BoundaryCorners {
    fn named(&self) -> [(&'static str, Corner); 4] {
        [
            ("upper-left", self.upper_left),
            ("upper-right", self.upper_right),
            ("lower-left", self.lower_left),
            ("lower-right", self.lower_right),
        ]
    }
}

/// The grid every band is resampled onto.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationGrid {
    pub transform: GeoTransform,
    pub crs: String,
    pub rows: usize,
    pub cols: usize,
}

impl DestinationGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_width(&self) -> f64 {
        self.transform[1]
    }

    /// Positive magnitude; the transform stores it negated.
    pub fn pixel_height(&self) -> f64 {
        -self.transform[5]
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.transform[0], self.transform[3])
    }

    /// Destination coordinate of the centre of pixel `(row, col)`.
    #[inline]
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.transform;
        (
            gt[0] + (col as f64 + 0.5) * gt[1],
            gt[3] + (row as f64 + 0.5) * gt[5],
        )
    }
}

/// Corner points of a source grid, straight from its transform.
pub fn source_corners(transform: &GeoTransform, shape: (usize, usize)) -> [(f64, f64); 4] {
    let (rows, cols) = shape;
    let (ox, oy) = (transform[0], transform[3]);
    let dx = transform[1] * cols as f64;
    let dy = transform[5] * rows as f64;
    [
        (ox, oy),
        (ox + dx, oy),
        (ox, oy + dy),
        (ox + dx, oy + dy),
    ]
}

/// Reproject the four source corners with `to_target`.
pub fn compute_boundaries(
    transform: &GeoTransform,
    shape: (usize, usize),
    to_target: &dyn PointTransform,
) -> Result<BoundaryCorners, GeometryError> {
    if transform[2] != 0.0 || transform[4] != 0.0 {
        return Err(GeometryError::Rotated(transform[2], transform[4]));
    }
    let src = source_corners(transform, shape);
    let mut xs: Vec<f64> = src.iter().map(|c| c.0).collect();
    let mut ys: Vec<f64> = src.iter().map(|c| c.1).collect();
    to_target.transform_points(&mut xs, &mut ys)?;

    let corner = |i: usize| Corner {
        source: src[i],
        destination: (xs[i], ys[i]),
    };
    let corners = BoundaryCorners {
        upper_left: corner(0),
        upper_right: corner(1),
        lower_left: corner(2),
        lower_right: corner(3),
    };
    for (name, c) in corners.named() {
        let (x, y) = c.destination;
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::NonFiniteCorner { corner: name, x, y });
        }
    }
    Ok(corners)
}

/// North-up transform whose extent is the envelope of the reprojected corners.
pub fn destination_transform(
    corners: &BoundaryCorners,
    shape: (usize, usize),
) -> Result<GeoTransform, GeometryError> {
    let (rows, cols) = shape;
    if rows == 0 || cols == 0 {
        return Err(GeometryError::EmptyShape(rows, cols));
    }
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (_, c) in corners.named() {
        let (x, y) = c.destination;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let width = (max_x - min_x) / cols as f64;
    let height = (max_y - min_y) / rows as f64;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(GeometryError::DegenerateExtent { width, height });
    }
    Ok([min_x, width, 0.0, max_y, 0.0, -height])
}

/// Index of the highest-resolution band (smallest pixel width, last on ties).
pub fn reference_band_index(bands: &[BandRaster]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, band) in bands.iter().enumerate() {
        let w = band.pixel_width();
        match best {
            Some((_, bw)) if w > bw => {}
            _ => best = Some((i, w)),
        }
    }
    best.map(|(i, _)| i)
}

/// Destination grid in `target_crs` covering `reference`, at the reference's shape.
pub fn destination_grid(
    reference: &BandRaster,
    target_crs: &str,
) -> Result<DestinationGrid, GeometryError> {
    let shape = reference.shape();
    let to_target = transform_between(&reference.crs, target_crs)?;
    let corners = compute_boundaries(&reference.transform, shape, to_target.as_ref())?;
    let transform = destination_transform(&corners, shape)?;
    debug!(
        "Destination grid {}x{} origin=({}, {}) pixel=({}, {})",
        shape.1, shape.0, transform[0], transform[3], transform[1], -transform[5]
    );
    Ok(DestinationGrid {
        transform,
        crs: target_crs.to_string(),
        rows: shape.0,
        cols: shape.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::projection::IdentityTransform;
    use ndarray::Array2;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    /// Test transform: shifts and scales y, mirrors nothing.
    struct Affine {
        dx: f64,
        sy: f64,
    }

    impl PointTransform for Affine {
        fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), GeometryError> {
            for x in xs.iter_mut() {
                *x += self.dx;
            }
            for y in ys.iter_mut() {
                *y *= self.sy;
            }
            Ok(())
        }
    }

    struct Collapse;

    impl PointTransform for Collapse {
        fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), GeometryError> {
            xs.fill(5.0);
            ys.fill(5.0);
            Ok(())
        }
    }

    struct Broken;

    impl PointTransform for Broken {
        fn transform_points(&self, xs: &mut [f64], _ys: &mut [f64]) -> Result<(), GeometryError> {
            xs[2] = f64::INFINITY;
            Ok(())
        }
    }

    #[test]
    fn thirty_metre_grid_under_identity() {
        let gt = [0.0, 30.0, 0.0, 0.0, 0.0, 30.0];
        let corners = compute_boundaries(&gt, (10, 10), &IdentityTransform).unwrap();
        assert_eq!(corners.upper_left.source, (0.0, 0.0));
        assert_eq!(corners.lower_right.source, (300.0, 300.0));
        let dst = destination_transform(&corners, (10, 10)).unwrap();
        assert_close(dst[1], 30.0);
        assert_close(dst[5], -30.0);
        assert_eq!((dst[0], dst[3]), (0.0, 300.0));
        assert_eq!((dst[2], dst[4]), (0.0, 0.0));
    }

    #[test]
    fn north_up_source_keeps_its_grid() {
        let gt = [500_000.0, 30.0, 0.0, 4_200_000.0, 0.0, -30.0];
        let corners = compute_boundaries(&gt, (200, 100), &IdentityTransform).unwrap();
        let dst = destination_transform(&corners, (200, 100)).unwrap();
        assert_eq!(dst, gt);
    }

    #[test]
    fn origin_is_min_x_max_y_of_reprojected_corners() {
        let gt = [100.0, 10.0, 0.0, 1000.0, 0.0, -10.0];
        let t = Affine { dx: -50.0, sy: 2.0 };
        let corners = compute_boundaries(&gt, (20, 40), &t).unwrap();
        let dst = destination_transform(&corners, (20, 40)).unwrap();
        let xs = [
            corners.upper_left.destination.0,
            corners.upper_right.destination.0,
            corners.lower_left.destination.0,
            corners.lower_right.destination.0,
        ];
        let ys = [
            corners.upper_left.destination.1,
            corners.upper_right.destination.1,
            corners.lower_left.destination.1,
            corners.lower_right.destination.1,
        ];
        assert_eq!(dst[0], xs.iter().cloned().fold(f64::INFINITY, f64::min));
        assert_eq!(dst[3], ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
        assert!(dst[1] > 0.0);
        assert!(dst[5] < 0.0);
        assert_close(dst[1], 10.0);
        assert_close(dst[5], -20.0);
    }

    #[test]
    fn collapsed_corners_are_fatal() {
        let gt = [0.0, 30.0, 0.0, 0.0, 0.0, -30.0];
        let corners = compute_boundaries(&gt, (10, 10), &Collapse).unwrap();
        let err = destination_transform(&corners, (10, 10)).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateExtent { .. }));
    }

    #[test]
    fn non_finite_corner_is_fatal() {
        let gt = [0.0, 30.0, 0.0, 0.0, 0.0, -30.0];
        let err = compute_boundaries(&gt, (10, 10), &Broken).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::NonFiniteCorner { corner: "lower-left", .. }
        ));
    }

    #[test]
    fn rotated_source_is_rejected() {
        let gt = [0.0, 30.0, 0.5, 0.0, 0.0, -30.0];
        let err = compute_boundaries(&gt, (10, 10), &IdentityTransform).unwrap_err();
        assert!(matches!(err, GeometryError::Rotated(..)));
    }

    #[test]
    fn empty_shape_is_rejected() {
        let gt = [0.0, 30.0, 0.0, 0.0, 0.0, -30.0];
        let corners = compute_boundaries(&gt, (10, 10), &IdentityTransform).unwrap();
        assert!(matches!(
            destination_transform(&corners, (0, 10)),
            Err(GeometryError::EmptyShape(0, 10))
        ));
    }

    #[test]
    fn reference_band_is_finest_and_last_on_ties() {
        let band = |px: f64| {
            BandRaster::new(
                Array2::zeros((2, 2)),
                [0.0, px, 0.0, 0.0, 0.0, -px],
                "EPSG:32633",
            )
        };
        assert_eq!(reference_band_index(&[band(30.0), band(15.0), band(30.0)]), Some(1));
        assert_eq!(reference_band_index(&[band(30.0), band(30.0)]), Some(1));
        assert_eq!(reference_band_index(&[]), None);
    }

    #[test]
    fn grid_for_identity_crs() {
        let reference = BandRaster::new(
            Array2::zeros((10, 10)),
            [0.0, 30.0, 0.0, 0.0, 0.0, 30.0],
            "EPSG:3857",
        );
        let grid = destination_grid(&reference, "EPSG:3857").unwrap();
        assert_eq!(grid.shape(), (10, 10));
        assert_close(grid.pixel_width(), 30.0);
        assert_close(grid.pixel_height(), 30.0);
        assert_eq!(grid.origin(), (0.0, 300.0));
        assert_eq!(grid.pixel_center(0, 0), (15.0, 285.0));
    }
}
