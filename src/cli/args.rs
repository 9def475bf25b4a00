use crate::models::{OutputFormat, Settings};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ndvi-timeseries")]
#[command(about = "NDVI time series per location from multi-band satellite rasters")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Settings file (TOML, JSON or YAML)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress bars and summaries")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the mean NDVI table for every location and acquisition
    Process {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(
            short,
            long,
            help = "Output file path [default: output/ndvi-timeseries-{YYMMDD}.<ext>]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, value_enum, help = "Output format [default: parquet]")]
        format: Option<OutputFormat>,

        #[arg(long, help = "Parquet compression (snappy, gzip, lz4, zstd, none)")]
        compression: Option<String>,
    },

    /// Check points, buffers and rasters without writing output
    Validate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Fetch missing acquisition files from the object store
    Download {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, help = "Object store prefix the files are fetched from")]
        base_url: Option<String>,

        #[arg(long, help = "Maximum concurrent downloads")]
        max_concurrent: Option<usize>,
    },

    /// Summarize an existing result table (CSV or Parquet)
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, help = "Print the summary as JSON")]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct InputArgs {
    #[arg(short, long, help = "Directory holding the points table and rasters")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, help = "Points table file name inside the data directory")]
    pub points_file: Option<String>,

    #[arg(
        short,
        long = "raster",
        help = "Raster file name inside the data directory (repeatable)"
    )]
    pub rasters: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    #[arg(short, long, help = "Buffer radius in meters")]
    pub buffer_distance: Option<f64>,

    #[arg(long, help = "Cloud probability threshold (0-100)")]
    pub cloud_threshold: Option<i32>,

    #[arg(long, help = "Red band index")]
    pub red_band: Option<usize>,

    #[arg(long, help = "Near-infrared band index")]
    pub nir_band: Option<usize>,

    #[arg(long, help = "Cloud probability band index")]
    pub cloud_band: Option<usize>,

    #[arg(long, help = "NDVI standard deviation threshold (x10000)")]
    pub std_threshold: Option<i32>,

    #[arg(long, help = "Minimum NDVI threshold (x10000)")]
    pub min_threshold: Option<i32>,

    #[arg(long, help = "UTM EPSG code used for every buffer")]
    pub projected_epsg: Option<u32>,

    #[arg(long)]
    pub max_workers: Option<usize>,
}

impl InputArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.data_dir {
            settings.input.data_dir = dir.clone();
        }
        if let Some(points) = &self.points_file {
            settings.input.points_file = points.clone();
        }
        if !self.rasters.is_empty() {
            settings.input.rasters = self.rasters.clone();
        }
    }
}

impl PipelineArgs {
    pub fn apply(&self, settings: &mut Settings) {
        let pipeline = &mut settings.pipeline;
        if let Some(v) = self.buffer_distance {
            pipeline.buffer_distance_m = v;
        }
        if let Some(v) = self.cloud_threshold {
            pipeline.cloud_prob_threshold = v;
        }
        if let Some(v) = self.red_band {
            pipeline.red_band = v;
        }
        if let Some(v) = self.nir_band {
            pipeline.nir_band = v;
        }
        if let Some(v) = self.cloud_band {
            pipeline.cloud_prob_band = v;
        }
        if let Some(v) = self.std_threshold {
            pipeline.ndvi_std_threshold = v;
        }
        if let Some(v) = self.min_threshold {
            pipeline.ndvi_min_threshold = v;
        }
        if self.projected_epsg.is_some() {
            pipeline.projected_epsg = self.projected_epsg;
        }
        if let Some(v) = self.max_workers {
            pipeline.max_workers = v;
        }
    }
}
