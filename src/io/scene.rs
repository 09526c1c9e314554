//! On-disk layout of one downloaded scene: where its band files and sidecar
//! live and where composites are written.
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{OutputFormat, Satellite, SidecarFormat};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLayout {
    pub scene_dir: PathBuf,
    pub scene_id: String,
    pub satellite: Satellite,
}

impl SceneLayout {
    pub fn new(scene_dir: impl Into<PathBuf>, scene_id: impl Into<String>, satellite: Satellite) -> Self {
        SceneLayout {
            scene_dir: scene_dir.into(),
            scene_id: scene_id.into(),
            satellite,
        }
    }

    /// Layout for a directory named after its scene; the family comes from the id.
    pub fn from_scene_dir(scene_dir: &Path) -> Result<Self> {
        let scene_id = scene_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::InvalidArgument {
                arg: "scene-dir",
                value: scene_dir.display().to_string(),
            })?;
        let satellite = Satellite::from_scene_id(&scene_id).ok_or_else(|| Error::InvalidArgument {
            arg: "scene",
            value: scene_id.clone(),
        })?;
        Ok(SceneLayout::new(scene_dir, scene_id, satellite))
    }

    pub fn band_path(&self, band: &str) -> PathBuf {
        self.scene_dir
            .join(self.satellite.band_file_name(&self.scene_id, band))
    }

    pub fn band_paths(&self, bands: &[String]) -> Vec<PathBuf> {
        bands.iter().map(|b| self.band_path(b)).collect()
    }

    /// Sidecar path and format. A Sentinel tile without `tileInfo.json`
    /// falls back to `MTD_TL.xml` when that file exists.
    pub fn metadata_source(&self) -> (PathBuf, SidecarFormat) {
        let default = self
            .scene_dir
            .join(self.satellite.metadata_file_name(&self.scene_id));
        if self.satellite == Satellite::Sentinel && !default.exists() {
            let xml = self.scene_dir.join("MTD_TL.xml");
            if xml.exists() {
                return (xml, SidecarFormat::Xml);
            }
        }
        (default, self.satellite.sidecar_format())
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.scene_dir.join("processed")
    }

    /// `<scene_dir>/processed/<scene>_<b1,b2,...>.<ext>`
    pub fn output_path(&self, bands: &[String], format: OutputFormat) -> PathBuf {
        self.processed_dir().join(format!(
            "{}_{}.{}",
            self.scene_id,
            bands.join(","),
            format.extension()
        ))
    }

    pub fn ensure_processed_dir(&self) -> Result<PathBuf> {
        let dir = self.processed_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Reject band ids the family does not have.
    pub fn validate_bands(&self, bands: &[String]) -> Result<()> {
        if bands.is_empty() {
            return Err(Error::MissingArgument {
                arg: "--bands".to_string(),
            });
        }
        for band in bands {
            if !self.satellite.is_known_band(band) {
                return Err(Error::InvalidArgument {
                    arg: "bands",
                    value: band.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn landsat_paths() {
        let layout = SceneLayout::new("/data/LC80440342016259LGN00", "LC80440342016259LGN00", Satellite::Landsat);
        assert_eq!(
            layout.band_paths(&ids(&["4", "3"])),
            vec![
                PathBuf::from("/data/LC80440342016259LGN00/LC80440342016259LGN00_B4.TIF"),
                PathBuf::from("/data/LC80440342016259LGN00/LC80440342016259LGN00_B3.TIF"),
            ]
        );
        assert_eq!(
            layout.metadata_source(),
            (
                PathBuf::from("/data/LC80440342016259LGN00/LC80440342016259LGN00_MTL.txt"),
                SidecarFormat::KeyValue
            )
        );
        assert_eq!(
            layout.output_path(&ids(&["4", "3", "2"]), OutputFormat::TIFF),
            PathBuf::from("/data/LC80440342016259LGN00/processed/LC80440342016259LGN00_4,3,2.TIF")
        );
    }

    #[test]
    fn sentinel_falls_back_to_xml_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SceneLayout::new(dir.path(), "S2A_tile_20160526_35UPR_0", Satellite::Sentinel);
        assert_eq!(layout.metadata_source().1, SidecarFormat::Json);

        fs::write(dir.path().join("MTD_TL.xml"), "<x/>").unwrap();
        assert_eq!(
            layout.metadata_source(),
            (dir.path().join("MTD_TL.xml"), SidecarFormat::Xml)
        );

        fs::write(dir.path().join("tileInfo.json"), "{}").unwrap();
        assert_eq!(layout.metadata_source().1, SidecarFormat::Json);
    }

    #[test]
    fn scene_dir_name_selects_family() {
        let layout = SceneLayout::from_scene_dir(Path::new("/scenes/LC81810252016195LGN00")).unwrap();
        assert_eq!(layout.satellite, Satellite::Landsat);
        assert_eq!(layout.scene_id, "LC81810252016195LGN00");
        assert!(SceneLayout::from_scene_dir(Path::new("/scenes/unknown")).is_err());
    }

    #[test]
    fn unknown_bands_are_rejected() {
        let layout = SceneLayout::new("/x", "LC8", Satellite::Landsat);
        assert!(layout.validate_bands(&ids(&["4", "3", "2"])).is_ok());
        assert!(layout.validate_bands(&ids(&["4", "13"])).is_err());
        assert!(layout.validate_bands(&[]).is_err());
    }
}
