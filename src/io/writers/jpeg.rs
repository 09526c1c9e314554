use jpeg_encoder::{ColorType, Encoder};
use ndarray::Array2;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::core::processing::normalize::NormalizedBands;
use crate::core::processing::pipeline::Composite;
use crate::io::writers::metadata::{CompositeMetadata, write_json_sidecar};
use crate::io::writers::tiff::projection_wkt;
use crate::io::writers::worldfile::{world_file_path, write_prj_file, write_world_file};

/// Interleave three equally shaped bands into packed RGB.
pub fn interleave_rgb(bands: &[Array2<u8>]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(bands.iter().map(|b| b.len()).sum());
    if let [r, g, b] = bands {
        for ((&r, &g), &b) in r.iter().zip(g.iter()).zip(b.iter()) {
            rgb.extend_from_slice(&[r, g, b]);
        }
    }
    rgb
}

/// Encode into a hidden temporary file beside `output`; the caller persists it.
fn encode_to_temp(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[u8],
    color: ColorType,
) -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    if cols > u16::MAX as usize || rows > u16::MAX as usize {
        return Err(format!("{}x{} exceeds the JPEG size limit", cols, rows).into());
    }
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".preview-")
        .suffix(".jpg")
        .tempfile_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let encoder = Encoder::new(&mut writer, 100);
        encoder.encode(data, cols as u16, rows as u16, color)?;
        writer.flush()?;
    }
    Ok(tmp)
}

pub fn write_gray_jpeg(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    encode_to_temp(output, cols, rows, data, ColorType::Luma)?.persist(output)?;
    Ok(())
}

pub fn write_rgb_jpeg(
    output: &Path,
    cols: usize,
    rows: usize,
    rgb_data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    encode_to_temp(output, cols, rows, rgb_data, ColorType::Rgb)?.persist(output)?;
    Ok(())
}

fn write_sidecars(
    output: &Path,
    composite: &Composite,
    meta: &CompositeMetadata,
    wkt: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    write_world_file(output, composite.transform())?;
    write_prj_file(output, wkt)?;
    write_json_sidecar(output, meta)?;
    Ok(())
}

fn remove_sidecars(output: &Path) {
    for path in [
        world_file_path(output),
        output.with_extension("prj"),
        output.with_extension("json"),
    ] {
        if path.is_file() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Write an 8-bit composite as a JPEG preview with `.jgw`, `.prj` and
/// `.json` sidecars. Only one- and three-band composites are accepted.
///
/// The image is moved onto `output` only once every sidecar is written; on
/// failure the sidecars written so far are removed and `output` is untouched.
pub fn write_composite_jpeg(
    output: &Path,
    composite: &Composite,
    meta: &CompositeMetadata,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let bands = match &composite.bands {
        NormalizedBands::U8(bands) => bands,
        NormalizedBands::U16(_) => {
            return Err("16-bit composites cannot be written as JPEG".into());
        }
    };
    let wkt = projection_wkt(composite.crs())?;
    let (cols, rows) = (composite.cols(), composite.rows());
    let image = match bands.len() {
        1 => {
            let gray: Vec<u8> = bands[0].iter().copied().collect();
            encode_to_temp(output, cols, rows, &gray, ColorType::Luma)?
        }
        3 => encode_to_temp(output, cols, rows, &interleave_rgb(bands), ColorType::Rgb)?,
        n => return Err(format!("JPEG preview needs 1 or 3 bands, got {}", n).into()),
    };
    if let Err(e) = write_sidecars(output, composite, meta, &wkt) {
        remove_sidecars(output);
        return Err(e);
    }
    image.persist(output)?;
    info!("Wrote JPEG preview to {:?}", output);
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::DestinationGrid;
    use crate::types::{CloudCoverage, Satellite};
    use ndarray::array;

    const WGS84: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;

    fn rgb_composite() -> (Composite, CompositeMetadata) {
        let composite = Composite {
            bands: NormalizedBands::U8(vec![Array2::from_elem((4, 4), 120u8); 3]),
            grid: DestinationGrid {
                transform: [10.0, 0.5, 0.0, 50.0, 0.0, -0.5],
                crs: WGS84.to_string(),
                rows: 4,
                cols: 4,
            },
            band_ids: vec!["4".into(), "3".into(), "2".into()],
            pansharpened: false,
        };
        let meta = CompositeMetadata::new(
            "LC80440342016259LGN00",
            Satellite::Landsat,
            CloudCoverage::new(5.0).unwrap(),
            &composite,
        );
        (composite, meta)
    }

    fn hidden_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
            .count()
    }

    #[test]
    fn rgb_is_pixel_interleaved() {
        let r = array![[1u8, 2], [3, 4]];
        let g = array![[10u8, 20], [30, 40]];
        let b = array![[100u8, 200], [250, 255]];
        assert_eq!(
            interleave_rgb(&[r, g, b]),
            vec![1, 10, 100, 2, 20, 200, 3, 30, 250, 4, 40, 255]
        );
    }

    #[test]
    fn gray_jpeg_has_soi_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.jpg");
        write_gray_jpeg(&path, 8, 8, &[128u8; 64]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn oversize_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.jpg");
        assert!(write_gray_jpeg(&path, 70_000, 1, &[]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn preview_comes_with_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("scene_4,3,2.jpg");
        let (composite, meta) = rgb_composite();

        write_composite_jpeg(&output, &composite, &meta).unwrap();
        assert!(output.exists());
        assert!(output.with_extension("jgw").exists());
        assert_eq!(std::fs::read_to_string(output.with_extension("prj")).unwrap(), WGS84);
        assert!(output.with_extension("json").exists());
        assert_eq!(hidden_entries(dir.path()), 0);
    }

    #[test]
    fn failed_sidecar_leaves_no_preview() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("scene_4,3,2.jpg");
        // A directory where the .prj belongs makes that write fail
        std::fs::create_dir(output.with_extension("prj")).unwrap();
        let (composite, meta) = rgb_composite();

        assert!(write_composite_jpeg(&output, &composite, &meta).is_err());
        assert!(!output.exists());
        assert!(!output.with_extension("jgw").exists());
        assert!(!output.with_extension("json").exists());
        assert_eq!(hidden_entries(dir.path()), 0);
    }

    #[test]
    fn sixteen_bit_composite_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("pair.jpg");
        let (mut composite, meta) = rgb_composite();
        composite.bands = NormalizedBands::U16(vec![Array2::from_elem((4, 4), 900u16); 2]);

        assert!(write_composite_jpeg(&output, &composite, &meta).is_err());
        assert!(!output.exists());
    }
}
