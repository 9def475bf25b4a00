use crate::error::{ProcessingError, Result};
use crate::models::OutputFormat;
use crate::utils::constants::DEFAULT_OUTPUT_DIR;
use chrono::{Datelike, Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Generate default output filename with format: ndvi-timeseries-{YYMMDD}.{csv,parquet}
pub fn generate_default_output_filename(format: OutputFormat) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!(
        "ndvi-timeseries-{:02}{:02}{:02}.{}",
        year,
        month,
        day,
        format.extension()
    );
    PathBuf::from(DEFAULT_OUTPUT_DIR).join(filename)
}

/// Extract the acquisition date encoded in a raster filename.
///
/// The whole stem is tried first (`2025-02-02.tiff`), then the first
/// `YYYY-MM-DD` or `YYYYMMDD` token inside it (`S2_20250202_T33S.tif`).
pub fn parse_acquisition_date(path: &Path) -> Result<NaiveDate> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            ProcessingError::Configuration(format!("Invalid raster file name: {}", path.display()))
        })?;

    if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
        return Ok(date);
    }

    let bytes = stem.as_bytes();
    for start in 0..bytes.len() {
        for (len, pattern) in [(10, "%Y-%m-%d"), (8, "%Y%m%d")] {
            let Some(token) = stem.get(start..start + len) else {
                continue;
            };
            if !token.as_bytes()[0].is_ascii_digit() {
                continue;
            }
            // Don't split a longer run of digits
            let bounded = start
                .checked_sub(1)
                .map_or(true, |i| !bytes[i].is_ascii_digit())
                && bytes
                    .get(start + len)
                    .map_or(true, |b| !b.is_ascii_digit());
            if !bounded {
                continue;
            }
            if let Ok(date) = NaiveDate::parse_from_str(token, pattern) {
                return Ok(date);
            }
        }
    }

    Err(ProcessingError::Configuration(format!(
        "No acquisition date found in raster file name '{}'",
        path.display()
    )))
}
