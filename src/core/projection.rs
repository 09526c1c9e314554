//! Point reprojection between coordinate reference systems.
//!
//! The pipeline only ever needs to move batches of `(x, y)` points, so the
//! primitive is a small trait. GDAL/OSR backs the general case; identical
//! CRS identifiers short-circuit to [`IdentityTransform`].
use gdal::errors::GdalError as GdalCrateError;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};

use tracing::debug;

use crate::core::geometry::GeometryError;

/// Transform a batch of points in place.
pub trait PointTransform {
    fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), GeometryError>;
}

/// No-op transform used when source and target CRS are the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl PointTransform for IdentityTransform {
    fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), GeometryError> {
        if xs.len() != ys.len() {
            return Err(GeometryError::CoordinateCount(xs.len(), ys.len()));
        }
        Ok(())
    }
}

/// OSR-backed transform between two CRS definitions (EPSG code or WKT).
pub struct GdalTransform {
    inner: CoordTransform,
}

fn spatial_ref(definition: &str) -> Result<SpatialRef, GdalCrateError> {
    let mut srs = SpatialRef::from_definition(definition)?;
    // x = easting/longitude regardless of the authority's axis order
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

impl GdalTransform {
    pub fn new(source: &str, target: &str) -> Result<Self, GeometryError> {
        let src = spatial_ref(source)?;
        let dst = spatial_ref(target)?;
        let inner = CoordTransform::new(&src, &dst)?;
        Ok(GdalTransform { inner })
    }
}

impl PointTransform for GdalTransform {
    fn transform_points(&self, xs: &mut [f64], ys: &mut [f64]) -> Result<(), GeometryError> {
        if xs.len() != ys.len() {
            return Err(GeometryError::CoordinateCount(xs.len(), ys.len()));
        }
        transform_or_nan(xs, ys, |x, y, z| self.inner.transform_coords(x, y, z))
    }
}

/// Run `transform` over the whole batch; when the batch fails, redo it point
/// by point and mark the points that still fail as NaN so they sample as
/// no-data.
fn transform_or_nan<F>(xs: &mut [f64], ys: &mut [f64], transform: F) -> Result<(), GeometryError>
where
    F: Fn(&mut [f64], &mut [f64], &mut [f64]) -> Result<(), GdalCrateError>,
{
    let (orig_xs, orig_ys) = (xs.to_vec(), ys.to_vec());
    let mut zs = vec![0.0; xs.len()];
    if transform(xs, ys, &mut zs).is_ok() {
        return Ok(());
    }

    let mut failed = 0usize;
    for i in 0..xs.len() {
        let (mut x, mut y, mut z) = ([orig_xs[i]], [orig_ys[i]], [0.0]);
        match transform(&mut x, &mut y, &mut z) {
            Ok(()) => {
                xs[i] = x[0];
                ys[i] = y[0];
            }
            Err(_) => {
                xs[i] = f64::NAN;
                ys[i] = f64::NAN;
                failed += 1;
            }
        }
    }
    debug!("{} of {} point(s) failed to transform", failed, xs.len());
    Ok(())
}

/// True when two CRS identifiers name the same reference system textually.
pub fn same_crs(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Build the transform taking points from `source` into `target`.
pub fn transform_between(
    source: &str,
    target: &str,
) -> Result<Box<dyn PointTransform>, GeometryError> {
    if same_crs(source, target) {
        Ok(Box::new(IdentityTransform))
    } else {
        Ok(Box::new(GdalTransform::new(source, target)?))
    }
}
