use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::geometry::GeoTransform;

/// World file path for an image: `.jgw` for JPEG, `.tfw` for TIFF, `.wld` otherwise.
pub fn world_file_path(output_image: &Path) -> PathBuf {
    let ext = output_image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let world_ext = match ext.as_str() {
        "jpg" | "jpeg" => "jgw",
        "tif" | "tiff" => "tfw",
        _ => "wld",
    };
    output_image.with_extension(world_ext)
}

/// The six world file values (A, D, B, E, C, F); C/F name the centre of the
/// upper-left pixel rather than its corner.
pub fn world_file_values(gt: &GeoTransform) -> [f64; 6] {
    let (a, b, d, e) = (gt[1], gt[2], gt[4], gt[5]);
    let c = gt[0] + 0.5 * a + 0.5 * b;
    let f = gt[3] + 0.5 * d + 0.5 * e;
    [a, d, b, e, c, f]
}

pub fn write_world_file(
    output_image: &Path,
    geotransform: &GeoTransform,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let world_path = world_file_path(output_image);
    let mut writer = BufWriter::new(File::create(&world_path)?);
    for v in world_file_values(geotransform) {
        writeln!(writer, "{:.12}", v)?;
    }
    writer.flush()?;
    Ok(world_path)
}

/// Write a `.prj` beside the image holding the CRS as WKT.
pub fn write_prj_file(
    output_image: &Path,
    wkt: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let prj_path = output_image.with_extension("prj");
    std::fs::write(&prj_path, wkt.as_bytes())?;
    Ok(prj_path)
}
