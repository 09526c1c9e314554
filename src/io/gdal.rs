use gdal::raster::ResampleAlg;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::geometry::GeoTransform;
use crate::core::raster::BandRaster;

/// Errors encountered when loading band rasters through GDAL
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Band file not found: {0:?}")]
    MissingFile(PathBuf),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("No georeferencing in {0:?}")]
    MissingGeoreference(PathBuf),
    #[error("Dimension mismatch: expected {0}x{1}, got {2} samples")]
    DimensionMismatch(usize, usize, usize),
}

/// Geometry of a GDAL dataset
#[derive(Debug, Clone)]
pub struct GdalMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: GeoTransform,
    /// `EPSG:nnnn` when the CRS itself has an EPSG authority, WKT otherwise
    pub projection: String,
}

/// Reader for single-band imagery (GeoTIFF, JPEG2000) via GDAL
pub struct GdalBandReader {
    pub dataset: Dataset,
    pub metadata: GdalMetadata,
}

/// `EPSG:nnnn` when the CRS root node carries an EPSG authority, the
/// definition unchanged otherwise. Authorities on inner nodes (datum, unit,
/// base GEOGCS) do not identify the CRS itself.
pub(crate) fn crs_identifier(definition: &str) -> String {
    if definition.starts_with("EPSG:") {
        return definition.to_string();
    }
    let Ok(srs) = SpatialRef::from_wkt(definition) else {
        return definition.to_string();
    };
    match (srs.auth_name(), srs.auth_code()) {
        (Some(name), Ok(code)) if name.eq_ignore_ascii_case("EPSG") => format!("EPSG:{}", code),
        _ => definition.to_string(),
    }
}

impl GdalBandReader {
    /// Open a GDAL-supported dataset; it must carry a geotransform and a projection
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GdalError::MissingFile(path.to_path_buf()));
        }
        let dataset = Dataset::open(path)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = dataset
            .geo_transform()
            .map_err(|_| GdalError::MissingGeoreference(path.to_path_buf()))?;
        let proj = dataset.projection();
        if proj.is_empty() {
            return Err(GdalError::MissingGeoreference(path.to_path_buf()));
        }
        let projection = crs_identifier(&proj);
        Ok(GdalBandReader {
            dataset,
            metadata: GdalMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection,
            },
        })
    }

    /// Read a single band (1-based index) as a u16 ndarray of shape (height, width)
    pub fn read_band(&self, index: usize) -> Result<Array2<u16>, GdalError> {
        if index == 0 || index > self.metadata.bands {
            return Err(GdalError::UnsupportedFormat(format!(
                "Band index {} out of range",
                index
            )));
        }
        let band = self.dataset.rasterband(index)?;
        let window = (self.metadata.size_x, self.metadata.size_y);
        let buf = band.read_as::<u16>(
            (0, 0),
            window,
            window,
            Some(ResampleAlg::NearestNeighbour),
        )?;
        let data_vec = buf.data().to_vec();
        let len = data_vec.len();
        Array2::from_shape_vec((self.metadata.size_y, self.metadata.size_x), data_vec).map_err(
            |_| GdalError::DimensionMismatch(self.metadata.size_x, self.metadata.size_y, len),
        )
    }
}

/// Load the first band of `path` with its geometry; everything else is dropped.
pub fn load_band(path: &Path) -> Result<BandRaster, GdalError> {
    let reader = GdalBandReader::open(path)?;
    let data = reader.read_band(1)?;
    debug!(
        "Loaded {:?}: {}x{} {}",
        path, reader.metadata.size_x, reader.metadata.size_y, reader.metadata.projection
    );
    let GdalMetadata {
        geotransform,
        projection,
        ..
    } = reader.metadata;
    Ok(BandRaster::new(data, geotransform, projection))
}

/// Load every band in parallel, preserving input order. Any failure fails all.
pub fn load_bands(paths: &[PathBuf]) -> Result<Vec<BandRaster>, GdalError> {
    info!("Loading {} band file(s)", paths.len());
    paths.par_iter().map(|p| load_band(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM_33N: &str = r#"PROJCS["WGS 84 / UTM zone 33N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",15],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","32633"]]"#;

    // No root authority; the last AUTHORITY in the text is the metre unit.
    const CUSTOM_POLAR: &str = r#"PROJCS["Custom Polar Stereographic",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Polar_Stereographic"],PARAMETER["latitude_of_origin",70],PARAMETER["central_meridian",-45],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]]]"#;

    #[test]
    fn root_authority_names_the_crs() {
        assert_eq!(crs_identifier(UTM_33N), "EPSG:32633");
        assert_eq!(crs_identifier("EPSG:3857"), "EPSG:3857");
    }

    #[test]
    fn inner_authorities_do_not_name_the_crs() {
        assert_eq!(crs_identifier(CUSTOM_POLAR), CUSTOM_POLAR);
        assert_eq!(crs_identifier("LOCAL_CS[\"x\""), "LOCAL_CS[\"x\"");
    }

    #[test]
    fn missing_file_is_reported_before_gdal() {
        let err = load_band(Path::new("/nonexistent/LC8_B4.TIF")).unwrap_err();
        assert!(matches!(err, GdalError::MissingFile(_)));
    }

    #[test]
    fn one_missing_band_fails_the_set() {
        let paths = vec![
            PathBuf::from("/nonexistent/B02.jp2"),
            PathBuf::from("/nonexistent/B03.jp2"),
        ];
        assert!(load_bands(&paths).is_err());
    }
}
