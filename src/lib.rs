#![doc = r#"
satcomp — cloud-aware RGB compositing for Landsat-8 and Sentinel-2 scenes.

This crate turns a downloaded scene (one GeoTIFF/JPEG2000 file per spectral band plus a
metadata sidecar) into a single georeferenced multi-band composite. Bands are reprojected
onto a common grid in a target CRS, optionally pansharpened with the Landsat panchromatic
band, and stretched from 16-bit reflectance to 8-bit display values with a two-regime
stretch that adapts to the scene's cloud coverage. It powers the satcomp CLI and can be
embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.

Quick start: composite a scene
------------------------------
```rust,no_run
use std::path::Path;
use satcomp::{compose_scene, ProcessingParams, Satellite, SceneLayout};

fn main() -> satcomp::Result<()> {
    let layout = SceneLayout::new(
        Path::new("/data/LC80440342016259LGN00"),
        "LC80440342016259LGN00",
        Satellite::Landsat,
    );
    let bands: Vec<String> = ["4", "3", "2"].iter().map(|b| b.to_string()).collect();

    // Written to /data/LC80440342016259LGN00/processed/LC80440342016259LGN00_4,3,2.TIF
    let output = compose_scene(&layout, &bands, &ProcessingParams::default())?;
    println!("{}", output.display());
    Ok(())
}
```

Pansharpening
-------------
Requesting three visible bands plus the panchromatic band (Landsat band 8) fuses them:
```rust,no_run
use std::path::Path;
use satcomp::{compose_scene, ProcessingParams, Satellite, SceneLayout};

fn main() -> satcomp::Result<()> {
    let layout = SceneLayout::from_scene_dir(Path::new("/data/LC80440342016259LGN00"))?;
    let bands: Vec<String> = ["4", "3", "2", "8"].iter().map(|b| b.to_string()).collect();
    compose_scene(&layout, &bands, &ProcessingParams::default())?;
    Ok(())
}
```

Composite in memory
-------------------
```rust,no_run
use std::path::Path;
use satcomp::{compose_scene_to_buffer, NormalizedBands, ProcessingParams, SceneLayout};

fn main() -> satcomp::Result<()> {
    let layout = SceneLayout::from_scene_dir(Path::new("/data/S2A_tile_20160526_35UPR_0"))?;
    let bands: Vec<String> = ["4", "3", "2"].iter().map(|b| b.to_string()).collect();
    let scene = compose_scene_to_buffer(&layout, &bands, &ProcessingParams::default())?;

    if let NormalizedBands::U8(rgb) = &scene.composite.bands {
        println!("{} bands, coverage {}", rgb.len(), scene.coverage);
    }
    Ok(())
}
```

Batch helpers
-------------
```rust,no_run
use std::path::Path;
use satcomp::{compose_directory, OutputFormat, ProcessingParams};

fn main() -> satcomp::Result<()> {
    let params = ProcessingParams {
        format: OutputFormat::JPEG,
        ..ProcessingParams::default()
    };
    let bands: Vec<String> = ["4", "3", "2"].iter().map(|b| b.to_string()).collect();

    let report = compose_directory(
        Path::new("/data/scenes"),
        None,  // infer the satellite from each directory name
        &bands,
        &params,
        true,  // continue_on_error
    )?;

    println!("processed={} skipped={} errors={}", report.processed, report.skipped, report.errors);
    if let Some(c) = report.coverage {
        println!("cloud coverage min={}% max={}%", c.min, c.max);
    }
    Ok(())
}
```

Error handling
--------------
All public functions return `satcomp::Result<T>`; match on `satcomp::Error` to handle specific
cases, e.g. GDAL or sidecar errors.

```rust,no_run
use std::path::Path;
use satcomp::{compose_scene, Error, ProcessingParams, SceneLayout, Satellite};

fn main() {
    let layout = SceneLayout::new(Path::new("/bad/scene"), "LC8_bad", Satellite::Landsat);
    let bands = vec!["4".to_string(), "3".to_string(), "2".to_string()];
    match compose_scene(&layout, &bands, &ProcessingParams::default()) {
        Ok(path) => println!("{}", path.display()),
        Err(Error::Gdal(e)) => eprintln!("GDAL error: {e}"),
        Err(Error::Metadata(e)) => eprintln!("Sidecar error: {e}"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`core`] — geometry, reprojection, pansharpening and the radiometric stretch.
- [`types`] — enums and core types (e.g. `Satellite`, `OutputFormat`, `CloudCoverage`).
- [`io`] — GDAL band loader, sidecar parsing, scene layout and writers.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::geometry::{DestinationGrid, GeoTransform, GeometryError};
pub use crate::core::params::ProcessingParams;
pub use crate::core::processing::normalize::{NormalizeError, NormalizedBands, RadiometricStretch};
pub use crate::core::raster::BandRaster;
pub use error::{Error, Result};
pub use types::{BitDepth, CloudCoverage, CoverageSummary, OutputFormat, Satellite, SidecarFormat};

// Readers
pub use io::gdal::{GdalBandReader, GdalError, GdalMetadata};
pub use io::metadata::{MetadataError, read_cloud_coverage};
pub use io::scene::SceneLayout;

// Selected writer helpers
pub use io::writers::metadata::{embed_tiff_metadata, write_json_sidecar};

// High-level API re-exports
pub use api::{
    BatchReport, Composite, CompositeMetadata, SceneComposite, build_composite,
    compose_directory, compose_scene, compose_scene_to_buffer, compose_scene_to_path,
    iterate_scene_dirs,
};
