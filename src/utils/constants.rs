/// File names
pub const DEFAULT_DATA_DIR: &str = "input_data";
pub const DEFAULT_POINTS_FILE: &str = "point_locations.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Acquisition files of the default study
pub const DEFAULT_RASTER_FILES: [&str; 5] = [
    "2025-02-02.tiff",
    "2025-03-14.tiff",
    "2025-04-25.tiff",
    "2025-05-13.tiff",
    "2025-07-25.tiff",
];

/// Object store holding the default acquisition files
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/geospatial-interview-2025-sept/";

/// Point table column names
pub const DEFAULT_X_COLUMN: &str = "X";
pub const DEFAULT_Y_COLUMN: &str = "Y";

/// Band layout (0-based positions in the band stack)
pub const REFERENCE_BAND: usize = 0;
pub const DEFAULT_RED_BAND: usize = 3;
pub const DEFAULT_NIR_BAND: usize = 7;
pub const DEFAULT_CLOUD_PROB_BAND: usize = 12;

/// Pipeline defaults
pub const DEFAULT_NODATA: i32 = 32767;
pub const DEFAULT_CLOUD_PROB_THRESHOLD: i32 = 50;
pub const DEFAULT_NDVI_STD_THRESHOLD: i32 = 1000;
pub const DEFAULT_NDVI_MIN_THRESHOLD: i32 = 2000;
pub const DEFAULT_BUFFER_DISTANCE_M: f64 = 1000.0;
pub const DEFAULT_QUADRANT_SEGMENTS: usize = 16;

/// NDVI integer scaling
pub const NDVI_SCALE: f64 = 10_000.0;
pub const NDVI_MIN: i32 = -10_000;
pub const NDVI_MAX: i32 = 10_000;

/// Coordinate reference systems
pub const EPSG_WGS84: u32 = 4326;
pub const UTM_MIN_LAT: f64 = -80.0;
pub const UTM_MAX_LAT: f64 = 84.0;

/// GeoTIFF tags
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GDAL_NODATA: u16 = 42113;

/// GeoKey identifiers
pub const GEOKEY_GEOGRAPHIC_TYPE: u16 = 2048;
pub const GEOKEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Acquisition defaults
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Result table date column
pub const DATE_COLUMN: &str = "date";

/// Parquet defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
