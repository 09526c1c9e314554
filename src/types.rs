//! Shared types and enums used across satcomp.
//! Includes `Satellite`, `SidecarFormat`, `OutputFormat`, `BitDepth`,
//! `CloudCoverage` and the `CoverageSummary` fold used by batch runs.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::io::metadata::MetadataError;

/// Satellite family; selects band naming, sidecar format and pan band.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum Satellite {
    Landsat,
    Sentinel,
}

const LANDSAT_BANDS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"];
const SENTINEL_BANDS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12",
];

impl Satellite {
    /// Infer the family from a scene id (`LC8...` is Landsat, `S2A...` Sentinel).
    pub fn from_scene_id(scene_id: &str) -> Option<Self> {
        match scene_id.chars().next() {
            Some('L') | Some('l') => Some(Satellite::Landsat),
            Some('S') | Some('s') => Some(Satellite::Sentinel),
            _ => None,
        }
    }

    pub fn all_bands(self) -> &'static [&'static str] {
        match self {
            Satellite::Landsat => LANDSAT_BANDS,
            Satellite::Sentinel => SENTINEL_BANDS,
        }
    }

    /// File name of one band inside the scene directory.
    pub fn band_file_name(self, scene_id: &str, band: &str) -> String {
        match self {
            Satellite::Landsat => format!("{}_B{}.TIF", scene_id, band),
            Satellite::Sentinel => format!("B{:0>2}.jp2", band),
        }
    }

    pub fn metadata_file_name(self, scene_id: &str) -> String {
        match self {
            Satellite::Landsat => format!("{}_MTL.txt", scene_id),
            Satellite::Sentinel => "tileInfo.json".to_string(),
        }
    }

    pub fn sidecar_format(self) -> SidecarFormat {
        match self {
            Satellite::Landsat => SidecarFormat::KeyValue,
            Satellite::Sentinel => SidecarFormat::Json,
        }
    }

    /// The high-resolution panchromatic band, if the family has one.
    pub fn panchromatic_band(self) -> Option<&'static str> {
        match self {
            Satellite::Landsat => Some("8"),
            Satellite::Sentinel => None,
        }
    }

    pub fn is_known_band(self, band: &str) -> bool {
        let trimmed = band.trim_start_matches('0');
        self.all_bands().iter().any(|b| *b == trimmed)
    }
}

impl std::fmt::Display for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Satellite::Landsat => write!(f, "landsat"),
            Satellite::Sentinel => write!(f, "sentinel"),
        }
    }
}

/// Layout of the per-scene metadata sidecar.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SidecarFormat {
    /// Newline-delimited `KEY = VALUE` block (Landsat MTL)
    KeyValue,
    /// JSON tag document (Sentinel tileInfo.json)
    Json,
    /// XML tag document (Sentinel MTD_TL.xml / MTD_MSIL1C.xml)
    Xml,
}

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum OutputFormat {
    TIFF,
    JPEG, // Lossy, preview only
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::TIFF => "TIF",
            OutputFormat::JPEG => "jpg",
        }
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize,
)]
pub enum BitDepth {
    U8,
    U16,
}

/// Scene cloud/snow coverage as a percentage in `[0, 100]`.
///
/// An exact zero is stored as [`CloudCoverage::EPSILON`] so the stretch never
/// collapses its cloud regime.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Serialize, Deserialize)]
pub struct CloudCoverage(f64);

impl CloudCoverage {
    pub const EPSILON: f64 = 0.1;

    pub fn new(percent: f64) -> Result<Self, MetadataError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(MetadataError::OutOfRange(percent));
        }
        if percent == 0.0 {
            Ok(CloudCoverage(Self::EPSILON))
        } else {
            Ok(CloudCoverage(percent))
        }
    }

    pub fn percent(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for CloudCoverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Min/max cloud coverage over a set of scenes.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub scenes: usize,
    pub min: f64,
    pub max: f64,
}

impl CoverageSummary {
    /// Fold a sequence of coverages; `None` when the sequence is empty.
    pub fn fold<I>(coverages: I) -> Option<Self>
    where
        I: IntoIterator<Item = CloudCoverage>,
    {
        coverages.into_iter().fold(None, |acc, c| {
            let p = c.percent();
            Some(match acc {
                None => CoverageSummary {
                    scenes: 1,
                    min: p,
                    max: p,
                },
                Some(s) => CoverageSummary {
                    scenes: s.scenes + 1,
                    min: s.min.min(p),
                    max: s.max.max(p),
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_coverage_becomes_epsilon() {
        let c = CloudCoverage::new(0.0).unwrap();
        assert_eq!(c.percent(), 0.1);
        assert_eq!(CloudCoverage::new(37.5).unwrap().percent(), 37.5);
    }

    #[test]
    fn coverage_outside_percent_range_is_rejected() {
        assert!(CloudCoverage::new(-1.0).is_err());
        assert!(CloudCoverage::new(100.5).is_err());
        assert!(CloudCoverage::new(f64::NAN).is_err());
        assert!(CloudCoverage::new(100.0).is_ok());
    }

    #[test]
    fn band_file_names_follow_family_convention() {
        assert_eq!(
            Satellite::Landsat.band_file_name("LC80440342016259LGN00", "4"),
            "LC80440342016259LGN00_B4.TIF"
        );
        assert_eq!(Satellite::Sentinel.band_file_name("ignored", "4"), "B04.jp2");
        assert_eq!(Satellite::Sentinel.band_file_name("ignored", "11"), "B11.jp2");
        assert_eq!(
            Satellite::Landsat.metadata_file_name("LC80440342016259LGN00"),
            "LC80440342016259LGN00_MTL.txt"
        );
        assert_eq!(Satellite::Sentinel.metadata_file_name("x"), "tileInfo.json");
    }

    #[test]
    fn family_is_inferred_from_scene_prefix() {
        assert_eq!(
            Satellite::from_scene_id("LC81810252016195LGN00"),
            Some(Satellite::Landsat)
        );
        assert_eq!(
            Satellite::from_scene_id("S2A_tile_20160715_35UPR_0"),
            Some(Satellite::Sentinel)
        );
        assert_eq!(Satellite::from_scene_id("X123"), None);
        assert_eq!(Satellite::from_scene_id(""), None);
    }

    #[test]
    fn known_bands_accept_zero_padding() {
        assert!(Satellite::Sentinel.is_known_band("04"));
        assert!(Satellite::Sentinel.is_known_band("12"));
        assert!(!Satellite::Landsat.is_known_band("12"));
        assert_eq!(Satellite::Landsat.panchromatic_band(), Some("8"));
        assert_eq!(Satellite::Sentinel.panchromatic_band(), None);
    }

    #[test]
    fn summary_folds_min_and_max() {
        let coverages = [12.0, 0.0, 48.25]
            .iter()
            .map(|&p| CloudCoverage::new(p).unwrap());
        let summary = CoverageSummary::fold(coverages).unwrap();
        assert_eq!(summary.scenes, 3);
        assert_eq!(summary.min, 0.1);
        assert_eq!(summary.max, 48.25);
        assert!(CoverageSummary::fold(std::iter::empty()).is_none());
    }
}
