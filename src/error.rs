use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Broad failure category, used for diagnostics at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    Io,
    Output,
    Network,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Data => "data error",
            ErrorKind::Io => "I/O error",
            ErrorKind::Output => "output error",
            ErrorKind::Network => "network error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Band index {index} ({role}) is invalid for a raster with {band_count} bands")]
    BandIndex {
        role: &'static str,
        index: usize,
        band_count: usize,
    },

    #[error("Buffer does not overlap raster {raster}")]
    NoOverlap { raster: String },

    #[error("Raster shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Unsupported coordinate reference system EPSG:{epsg}")]
    UnsupportedCrs { epsg: u32 },

    #[error("Download of {url} failed with HTTP status {status}")]
    Download { url: String, status: u16 },

    #[error("location {location}, acquisition {date} ({raster}): {source}")]
    Context {
        location: String,
        date: NaiveDate,
        raster: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("acquisition {date} ({raster}): {source}")]
    RasterContext {
        date: NaiveDate,
        raster: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::Io(_) => ErrorKind::Io,
            ProcessingError::Csv(_)
            | ProcessingError::DateParse(_)
            | ProcessingError::ConfigLoad(_)
            | ProcessingError::Validation(_)
            | ProcessingError::Configuration(_)
            | ProcessingError::BandIndex { .. } => ErrorKind::Configuration,
            ProcessingError::Tiff(_)
            | ProcessingError::Shape(_)
            | ProcessingError::Data(_)
            | ProcessingError::NoOverlap { .. }
            | ProcessingError::ShapeMismatch { .. }
            | ProcessingError::UnsupportedCrs { .. } => ErrorKind::Data,
            ProcessingError::Parquet(_) | ProcessingError::Arrow(_) => ErrorKind::Output,
            ProcessingError::Http(_)
            | ProcessingError::Download { .. }
            | ProcessingError::TaskJoin(_) => ErrorKind::Network,
            ProcessingError::Context { source, .. }
            | ProcessingError::RasterContext { source, .. } => source.kind(),
        }
    }

    /// Attach the location, acquisition and raster a failure happened in.
    pub fn in_context(self, location: &str, date: NaiveDate, raster: &str) -> Self {
        ProcessingError::Context {
            location: location.to_string(),
            date,
            raster: raster.to_string(),
            source: Box::new(self),
        }
    }

    /// Attach the acquisition and raster of a failure not tied to any location.
    pub fn in_raster_context(self, date: NaiveDate, raster: &str) -> Self {
        ProcessingError::RasterContext {
            date,
            raster: raster.to_string(),
            source: Box::new(self),
        }
    }
}
