use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use satcomp::api::{compose_directory, compose_scene, compose_scene_to_path};
use satcomp::core::params::ProcessingParams;
use satcomp::io::SceneLayout;
use satcomp::types::Satellite;

use super::args::CliArgs;
use super::errors::AppError;

/// Config file (if any) first, then explicit flags on top.
fn resolve_params(args: &CliArgs) -> Result<ProcessingParams, AppError> {
    let mut params = match &args.config {
        Some(path) => ProcessingParams::from_json_file(path)?,
        None => ProcessingParams::default(),
    };
    if let Some(format) = args.format {
        params.format = format;
    }
    if let Some(crs) = &args.target_crs {
        params.target_crs = crs.clone();
    }
    if args.no_pansharpen {
        params.pansharpen = false;
    }
    if let Some(low) = args.low_percentile {
        params.low_percentile = low;
    }
    Ok(params)
}

fn scene_layout(
    scene_dir: &Path,
    scene: Option<&str>,
    satellite: Option<Satellite>,
) -> Result<SceneLayout, AppError> {
    let scene_id = match scene {
        Some(id) => id.to_string(),
        None => scene_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or(AppError::MissingArgument {
                arg: "--scene".to_string(),
            })?,
    };
    let satellite = match satellite.or_else(|| Satellite::from_scene_id(&scene_id)) {
        Some(s) => s,
        None => return Err(AppError::UnknownSatellite { scene: scene_id }),
    };
    Ok(SceneLayout::new(scene_dir, scene_id, satellite))
}

fn process_single_scene(
    args: &CliArgs,
    scene_dir: &Path,
    params: &ProcessingParams,
) -> Result<PathBuf, AppError> {
    let layout = scene_layout(scene_dir, args.scene.as_deref(), args.satellite)?;
    let written = match &args.output {
        Some(output) => compose_scene_to_path(&layout, &args.bands, output, params)?.0,
        None => compose_scene(&layout, &args.bands, params)?,
    };
    Ok(written)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let params = resolve_params(&args)?;

    match (&args.scene_dir, &args.scenes_dir) {
        (Some(_), Some(_)) => Err(AppError::ConflictingArguments {
            first: "--scene-dir",
            second: "--scenes-dir",
        }
        .into()),
        (None, Some(root)) => {
            if args.output.is_some() {
                return Err(AppError::ConflictingArguments {
                    first: "--output",
                    second: "--scenes-dir",
                }
                .into());
            }
            info!("Starting batch compositing from directory: {:?}", root);
            let report = compose_directory(root, args.satellite, &args.bands, &params, args.batch)?;

            info!("Batch compositing complete!");
            info!("Processed: {}", report.processed);
            info!("Skipped: {}", report.skipped);
            info!("Errors: {}", report.errors);
            match report.coverage {
                Some(summary) => info!(
                    "Cloud coverage over {} scene(s): min {}%, max {}%",
                    summary.scenes, summary.min, summary.max
                ),
                None => info!("No scenes processed"),
            }
            Ok(())
        }
        (Some(scene_dir), None) => {
            let written = process_single_scene(&args, scene_dir, &params)?;
            info!("Successfully processed: {:?} -> {:?}", scene_dir, written);
            Ok(())
        }
        (None, None) => Err(AppError::MissingArgument {
            arg: "--scene-dir or --scenes-dir".to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use satcomp::types::OutputFormat;
    use std::io::Write;

    #[test]
    fn flags_override_config() {
        let mut config = tempfile::NamedTempFile::new().unwrap();
        write!(config, r#"{{"format": "JPEG", "target_crs": "EPSG:4326"}}"#).unwrap();
        let path = config.path().to_string_lossy().to_string();

        let args = CliArgs::try_parse_from([
            "satcomp",
            "--bands",
            "4,3,2",
            "--config",
            path.as_str(),
            "--target-crs",
            "EPSG:32633",
            "--no-pansharpen",
        ])
        .unwrap();
        let params = resolve_params(&args).unwrap();
        assert_eq!(params.format, OutputFormat::JPEG);
        assert_eq!(params.target_crs, "EPSG:32633");
        assert!(!params.pansharpen);
    }

    #[test]
    fn scene_id_defaults_to_directory_name() {
        let layout = scene_layout(Path::new("/data/S2A_tile_20160526_35UPR_0"), None, None).unwrap();
        assert_eq!(layout.satellite, Satellite::Sentinel);
        assert_eq!(layout.scene_id, "S2A_tile_20160526_35UPR_0");

        assert!(matches!(
            scene_layout(Path::new("/data/tile"), None, None),
            Err(AppError::UnknownSatellite { .. })
        ));
        let forced = scene_layout(Path::new("/data/tile"), None, Some(Satellite::Landsat)).unwrap();
        assert_eq!(forced.satellite, Satellite::Landsat);
    }
}
