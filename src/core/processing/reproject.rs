use ndarray::{Array2, ArrayViewMut2, s};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::core::geometry::{DestinationGrid, GeometryError};
use crate::core::projection::{PointTransform, transform_between};
use crate::core::raster::BandRaster;

/// Destination rows transformed per batch; bounds the coordinate buffers.
const ROW_BLOCK: usize = 256;

/// Source-CRS coordinates of the destination pixel centres of a row block.
struct SourceCoords {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl SourceCoords {
    fn for_rows(
        grid: &DestinationGrid,
        rows: std::ops::Range<usize>,
        to_source: &dyn PointTransform,
    ) -> Result<Self, GeometryError> {
        let n = rows.len() * grid.cols;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for r in rows {
            for c in 0..grid.cols {
                let (x, y) = grid.pixel_center(r, c);
                xs.push(x);
                ys.push(y);
            }
        }
        to_source.transform_points(&mut xs, &mut ys)?;
        Ok(SourceCoords { xs, ys })
    }
}

fn sample_nearest(band: &BandRaster, coords: &SourceCoords, out: &mut ArrayViewMut2<u16>) {
    let cols = out.ncols();
    for ((i, j), px) in out.indexed_iter_mut() {
        let k = i * cols + j;
        *px = band.pixel_at(coords.xs[k], coords.ys[k]).unwrap_or(0);
    }
}

/// Resample every band onto `grid` with nearest-neighbour lookup.
///
/// Destination pixel centres are transformed into each band's CRS on the
/// calling thread, one row block at a time; the lookups then run in parallel
/// across bands. Pixels that fall outside a source grid or fail to transform
/// are 0.
pub fn reproject_bands(
    bands: &[BandRaster],
    grid: &DestinationGrid,
) -> Result<Vec<Array2<u16>>, GeometryError> {
    if bands.is_empty() {
        return Err(GeometryError::NoBands);
    }

    // One transform per distinct source CRS
    let mut transforms: Vec<(String, Box<dyn PointTransform>)> = Vec::new();
    let mut transform_of = Vec::with_capacity(bands.len());
    for band in bands {
        let idx = match transforms.iter().position(|(crs, _)| *crs == band.crs) {
            Some(i) => i,
            None => {
                transforms.push((band.crs.clone(), transform_between(&grid.crs, &band.crs)?));
                transforms.len() - 1
            }
        };
        transform_of.push(idx);
    }

    info!(
        "Reprojecting {} band(s) onto {}x{} grid in {}",
        bands.len(),
        grid.cols,
        grid.rows,
        grid.crs
    );

    let mut outputs: Vec<Array2<u16>> = bands
        .iter()
        .map(|_| Array2::zeros((grid.rows, grid.cols)))
        .collect();

    let mut start = 0;
    while start < grid.rows {
        let end = (start + ROW_BLOCK).min(grid.rows);
        let coords = transforms
            .iter()
            .map(|(_, t)| SourceCoords::for_rows(grid, start..end, t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        outputs
            .par_iter_mut()
            .zip(bands.par_iter())
            .zip(transform_of.par_iter())
            .for_each(|((out, band), &t)| {
                let mut block = out.slice_mut(s![start..end, ..]);
                sample_nearest(band, &coords[t], &mut block);
            });
        debug!("Reprojected rows {}..{}", start, end);
        start = end;
    }

    Ok(outputs)
}

/// Single-band convenience over [`reproject_bands`].
pub fn reproject_band(
    band: &BandRaster,
    grid: &DestinationGrid,
) -> Result<Array2<u16>, GeometryError> {
    let mut out = reproject_bands(std::slice::from_ref(band), grid)?;
    Ok(out.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::destination_grid;

    fn ramp(rows: usize, cols: usize) -> Array2<u16> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * 100 + c + 1) as u16)
    }

    #[test]
    fn identity_round_trip_north_up() {
        let data = ramp(10, 10);
        let band = BandRaster::new(
            data.clone(),
            [0.0, 30.0, 0.0, 300.0, 0.0, -30.0],
            "EPSG:3857",
        );
        let grid = destination_grid(&band, "EPSG:3857").unwrap();
        let out = reproject_band(&band, &grid).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn south_up_source_is_flipped_onto_north_up_grid() {
        let data = ramp(4, 3);
        let band = BandRaster::new(data.clone(), [0.0, 30.0, 0.0, 0.0, 0.0, 30.0], "EPSG:3857");
        let grid = destination_grid(&band, "EPSG:3857").unwrap();
        let out = reproject_band(&band, &grid).unwrap();
        for r in 0..4 {
            for c in 0..3 {
                assert_eq!(out[(r, c)], data[(3 - r, c)]);
            }
        }
    }

    #[test]
    fn coarse_band_is_replicated_onto_fine_grid() {
        let coarse = BandRaster::new(
            ramp(2, 2),
            [0.0, 30.0, 0.0, 60.0, 0.0, -30.0],
            "EPSG:32633",
        );
        let fine = BandRaster::new(
            Array2::zeros((4, 4)),
            [0.0, 15.0, 0.0, 60.0, 0.0, -15.0],
            "EPSG:32633",
        );
        let grid = destination_grid(&fine, "EPSG:32633").unwrap();
        let out = reproject_bands(&[coarse, fine], &grid).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][(0, 0)], 1);
        assert_eq!(out[0][(1, 1)], 1);
        assert_eq!(out[0][(0, 3)], 2);
        assert_eq!(out[0][(3, 0)], 101);
        assert_eq!(out[0][(3, 3)], 102);
    }

    #[test]
    fn pixels_outside_source_are_no_data() {
        let band = BandRaster::new(
            ramp(2, 2),
            [0.0, 10.0, 0.0, 20.0, 0.0, -10.0],
            "EPSG:3857",
        );
        let grid = DestinationGrid {
            transform: [-10.0, 10.0, 0.0, 20.0, 0.0, -10.0],
            crs: "EPSG:3857".to_string(),
            rows: 2,
            cols: 4,
        };
        let out = reproject_band(&band, &grid).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![0, 1, 2, 0]);
        assert_eq!(out.row(1).to_vec(), vec![0, 101, 102, 0]);
    }

    #[test]
    fn untransformable_centres_are_no_data() {
        let band = BandRaster::new(ramp(1, 3), [0.0, 10.0, 0.0, 10.0, 0.0, -10.0], "EPSG:3857");
        let coords = SourceCoords {
            xs: vec![5.0, f64::NAN, 25.0],
            ys: vec![5.0, f64::NAN, 5.0],
        };
        let mut out = Array2::<u16>::from_elem((1, 3), 7);
        sample_nearest(&band, &coords, &mut out.view_mut());
        assert_eq!(out.row(0).to_vec(), vec![1, 0, 3]);
    }

    #[test]
    fn tall_grid_spans_several_row_blocks() {
        let rows = ROW_BLOCK * 2 + 7;
        let data = Array2::from_shape_fn((rows, 3), |(r, c)| (r % 60_000) as u16 + c as u16);
        let band = BandRaster::new(
            data.clone(),
            [0.0, 1.0, 0.0, rows as f64, 0.0, -1.0],
            "EPSG:3857",
        );
        let grid = destination_grid(&band, "EPSG:3857").unwrap();
        assert_eq!(reproject_band(&band, &grid).unwrap(), data);
    }

    #[test]
    fn empty_band_list_is_rejected() {
        let grid = DestinationGrid {
            transform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            crs: "EPSG:3857".to_string(),
            rows: 1,
            cols: 1,
        };
        assert!(matches!(
            reproject_bands(&[], &grid),
            Err(GeometryError::NoBands)
        ));
    }
}
