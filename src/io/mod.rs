//! I/O layer: GDAL-backed band loading, scene sidecar parsing, the on-disk
//! scene layout, and `writers` for GeoTIFF/JPEG outputs and metadata.
pub mod gdal;
pub use self::gdal::{GdalBandReader, GdalError, GdalMetadata, load_band, load_bands};

pub mod metadata;
pub use metadata::{MetadataError, parse_cloud_coverage, read_cloud_coverage};

pub mod scene;
pub use scene::SceneLayout;

pub mod writers;
