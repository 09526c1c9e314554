//! Cloud/snow coverage extraction from scene sidecars.
//!
//! Landsat scenes carry a `KEY = VALUE` MTL block, Sentinel tiles a JSON
//! `tileInfo.json` and, for full products, an XML `MTD_TL.xml`.
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{CloudCoverage, SidecarFormat};

/// Errors encountered when reading a scene sidecar
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error reading sidecar: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Missing field `{0}` in scene metadata")]
    MissingField(&'static str),
    #[error("Invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("Cloud coverage {0} is outside 0..=100")]
    OutOfRange(f64),
}

const MTL_CLOUD_KEY: &str = "CLOUD_COVER";
const JSON_CLOUD_FIELD: &str = "cloudyPixelPercentage";
const XML_CLOUD_TAGS: &[&str] = &["CLOUDY_PIXEL_PERCENTAGE", "Cloud_Coverage_Assessment"];

#[derive(Debug, Deserialize)]
struct TileInfo {
    #[serde(rename = "cloudyPixelPercentage")]
    cloudy_pixel_percentage: Option<serde_json::Value>,
}

/// Read the sidecar at `path` and return its cloud coverage.
///
/// A `.xml` extension always selects the XML parser, whatever the family
/// default is.
pub fn read_cloud_coverage(
    path: &Path,
    format: SidecarFormat,
) -> Result<CloudCoverage, MetadataError> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => SidecarFormat::Xml,
        _ => format,
    };
    debug!("Reading cloud coverage from {:?} as {:?}", path, format);
    let text = fs::read_to_string(path)?;
    let coverage = parse_cloud_coverage(&text, format)?;
    info!("The cloud coverage is {}", coverage);
    Ok(coverage)
}

pub fn parse_cloud_coverage(
    text: &str,
    format: SidecarFormat,
) -> Result<CloudCoverage, MetadataError> {
    match format {
        SidecarFormat::KeyValue => parse_mtl(text),
        SidecarFormat::Json => parse_tile_info(text),
        SidecarFormat::Xml => parse_xml(text),
    }
}

fn parse_percent(field: &'static str, raw: &str) -> Result<CloudCoverage, MetadataError> {
    let cleaned = raw.trim().trim_matches('"');
    let value: f64 = cleaned.parse().map_err(|_| MetadataError::InvalidValue {
        field,
        value: raw.to_string(),
    })?;
    CloudCoverage::new(value)
}

fn parse_mtl(text: &str) -> Result<CloudCoverage, MetadataError> {
    for line in text.lines() {
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == MTL_CLOUD_KEY {
                return parse_percent(MTL_CLOUD_KEY, value);
            }
        }
    }
    Err(MetadataError::MissingField(MTL_CLOUD_KEY))
}

fn parse_tile_info(text: &str) -> Result<CloudCoverage, MetadataError> {
    let info: TileInfo = serde_json::from_str(text)?;
    match info.cloudy_pixel_percentage {
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(v) => CloudCoverage::new(v),
            None => Err(MetadataError::InvalidValue {
                field: JSON_CLOUD_FIELD,
                value: n.to_string(),
            }),
        },
        Some(serde_json::Value::String(s)) => parse_percent(JSON_CLOUD_FIELD, &s),
        Some(other) => Err(MetadataError::InvalidValue {
            field: JSON_CLOUD_FIELD,
            value: other.to_string(),
        }),
        None => Err(MetadataError::MissingField(JSON_CLOUD_FIELD)),
    }
}

fn parse_xml(text: &str) -> Result<CloudCoverage, MetadataError> {
    let mut reader = Reader::from_reader(text.as_bytes());
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut curr = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                curr = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Event::End(_) => curr.clear(),
            Event::Text(e) => {
                if let Some(tag) = XML_CLOUD_TAGS.iter().find(|t| **t == curr) {
                    let txt = e.unescape()?;
                    return parse_percent(tag, &txt);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(MetadataError::MissingField(XML_CLOUD_TAGS[0]))
}
