use crate::error::Result;
use crate::utils::constants::*;
use crate::utils::parse_utm_epsg;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

/// Result table file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    #[default]
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => Some(OutputFormat::Csv),
            Some("parquet") | Some("pq") => Some(OutputFormat::Parquet),
            _ => None,
        }
    }
}

/// Complete run configuration, layered from defaults, an optional file,
/// `NDVI__*` environment variables and CLI flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub input: InputSettings,
    #[validate(nested)]
    pub pipeline: PipelineConfig,
    #[validate(nested)]
    pub acquisition: AcquisitionSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Load and validate settings. `path` may be TOML, JSON or YAML.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("NDVI")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn points_path(&self) -> PathBuf {
        self.input.data_dir.join(&self.input.points_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InputSettings {
    pub data_dir: PathBuf,

    #[validate(length(min = 1))]
    pub points_file: String,

    #[validate(length(min = 1))]
    pub x_column: String,

    #[validate(length(min = 1))]
    pub y_column: String,

    pub id_column: Option<String>,

    /// Raster file names inside `data_dir`, in processing order. Empty means
    /// every `.tif`/`.tiff` in `data_dir`.
    pub rasters: Vec<String>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            points_file: DEFAULT_POINTS_FILE.to_string(),
            x_column: DEFAULT_X_COLUMN.to_string(),
            y_column: DEFAULT_Y_COLUMN.to_string(),
            id_column: None,
            rasters: DEFAULT_RASTER_FILES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Parameters of the per-image and per-series pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_pipeline"))]
pub struct PipelineConfig {
    /// Buffer radius in meters
    #[validate(range(exclusive_min = 0.0))]
    pub buffer_distance_m: f64,

    /// Segments per quarter circle of the buffer polygon
    #[validate(range(min = 1, max = 1024))]
    pub buffer_quadrant_segments: usize,

    /// Metric CRS for buffering; `None` picks the UTM zone of each point
    pub projected_epsg: Option<u32>,

    pub nodata: i32,

    #[validate(range(min = 0, max = 100))]
    pub cloud_prob_threshold: i32,

    pub red_band: usize,
    pub nir_band: usize,
    pub cloud_prob_band: usize,

    #[validate(range(min = 0))]
    pub ndvi_std_threshold: i32,

    #[validate(range(min = -10000, max = 10000))]
    pub ndvi_min_threshold: i32,

    #[validate(range(min = 1))]
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_distance_m: DEFAULT_BUFFER_DISTANCE_M,
            buffer_quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
            projected_epsg: None,
            nodata: DEFAULT_NODATA,
            cloud_prob_threshold: DEFAULT_CLOUD_PROB_THRESHOLD,
            red_band: DEFAULT_RED_BAND,
            nir_band: DEFAULT_NIR_BAND,
            cloud_prob_band: DEFAULT_CLOUD_PROB_BAND,
            ndvi_std_threshold: DEFAULT_NDVI_STD_THRESHOLD,
            ndvi_min_threshold: DEFAULT_NDVI_MIN_THRESHOLD,
            max_workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    /// Largest band index the pipeline reads.
    pub fn max_band_index(&self) -> usize {
        REFERENCE_BAND
            .max(self.red_band)
            .max(self.nir_band)
            .max(self.cloud_prob_band)
    }
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

fn validate_pipeline(config: &PipelineConfig) -> std::result::Result<(), ValidationError> {
    if (NDVI_MIN..=NDVI_MAX).contains(&config.nodata) {
        return Err(invalid(
            "nodata",
            format!(
                "nodata {} collides with the NDVI range [{}, {}]",
                config.nodata, NDVI_MIN, NDVI_MAX
            ),
        ));
    }
    if config.red_band == config.nir_band {
        return Err(invalid(
            "band_indices",
            format!("red and NIR bands must differ (both {})", config.red_band),
        ));
    }
    if let Some(epsg) = config.projected_epsg {
        if parse_utm_epsg(epsg).is_none() {
            return Err(invalid(
                "projected_epsg",
                format!("EPSG:{} is not a WGS84 UTM zone", epsg),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AcquisitionSettings {
    #[validate(url)]
    pub base_url: String,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    #[validate(range(min = 1))]
    pub max_concurrent: usize,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub output_file: Option<PathBuf>,
    pub format: OutputFormat,
    pub compression: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_file: None,
            format: OutputFormat::default(),
            compression: COMPRESSION_SNAPPY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.pipeline.nodata, 32767);
        assert_eq!(settings.pipeline.red_band, 3);
        assert_eq!(settings.pipeline.nir_band, 7);
        assert_eq!(settings.pipeline.cloud_prob_band, 12);
        assert_eq!(settings.input.rasters.len(), 5);
        assert_eq!(settings.pipeline.max_band_index(), 12);
    }

    #[test]
    fn test_invalid_pipeline_values() {
        let mut config = PipelineConfig {
            buffer_distance_m: 0.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        config.buffer_distance_m = 500.0;
        config.cloud_prob_threshold = 101;
        assert!(config.validate().is_err());

        config.cloud_prob_threshold = 50;
        config.nodata = 0;
        assert!(config.validate().is_err());

        config.nodata = 32767;
        config.nir_band = config.red_band;
        assert!(config.validate().is_err());

        config.nir_band = 7;
        config.projected_epsg = Some(3857);
        assert!(config.validate().is_err());

        config.projected_epsg = Some(32633);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
[input]
data_dir = "fixtures"
rasters = ["2025-02-02.tiff"]

[pipeline]
buffer_distance_m = 500.0
red_band = 1
nir_band = 2
cloud_prob_band = 3

[output]
format = "csv"
"#
        )?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.input.data_dir, PathBuf::from("fixtures"));
        assert_eq!(settings.input.rasters, vec!["2025-02-02.tiff".to_string()]);
        assert_eq!(settings.pipeline.buffer_distance_m, 500.0);
        assert_eq!(settings.pipeline.nir_band, 2);
        assert_eq!(settings.pipeline.nodata, 32767);
        assert_eq!(settings.output.format, OutputFormat::Csv);
        Ok(())
    }

    #[test]
    fn test_load_rejects_invalid_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[pipeline]\ncloud_prob_threshold = 150")?;

        let err = Settings::load(Some(file.path())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        Ok(())
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/table.CSV")),
            Some(OutputFormat::Csv)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out/table.parquet")),
            Some(OutputFormat::Parquet)
        );
        assert_eq!(OutputFormat::from_path(Path::new("out/table")), None);
    }
}
