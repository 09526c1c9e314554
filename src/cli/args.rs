use clap::Parser;
use std::path::PathBuf;

use satcomp::types::{OutputFormat, Satellite};

#[derive(Parser, Debug)]
#[command(name = "satcomp", version, about = "Multi-spectral scene compositor")]
pub struct CliArgs {
    /// Scene directory holding the band files and sidecar (single scene mode)
    #[arg(long)]
    pub scene_dir: Option<PathBuf>,

    /// Scene id; defaults to the scene directory name
    #[arg(long)]
    pub scene: Option<String>,

    /// Directory whose subdirectories are scenes (batch mode)
    #[arg(long)]
    pub scenes_dir: Option<PathBuf>,

    /// Ordered band ids, comma separated (e.g. 4,3,2 or 4,3,2,8 to pansharpen)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub bands: Vec<String>,

    /// Satellite family; inferred from the scene id when omitted
    #[arg(long, value_enum)]
    pub satellite: Option<Satellite>,

    /// Output filename (single scene mode); defaults to <scene-dir>/processed/
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (tiff or jpeg)
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Target CRS of the composite (e.g., EPSG:3857, EPSG:32633)
    #[arg(long)]
    pub target_crs: Option<String>,

    /// Skip fusion with the panchromatic band
    #[arg(long, default_value_t = false)]
    pub no_pansharpen: bool,

    /// Lower percentile of the clear-sky stretch
    #[arg(long)]
    pub low_percentile: Option<f64>,

    /// JSON file with processing parameters; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Batch mode: continue with other scenes when one fails
    #[arg(long, default_value_t = false)]
    pub batch: bool,
}
