use crate::error::{ProcessingError, Result};
use crate::models::{Acquisition, InputSettings};
use crate::readers::GeoTiffFile;
use crate::utils::parse_acquisition_date;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves configured raster file names into dated acquisitions.
#[derive(Debug, Clone)]
pub struct AcquisitionCatalog {
    data_dir: PathBuf,
    rasters: Vec<String>,
}

impl AcquisitionCatalog {
    /// An empty `rasters` list means every `.tif`/`.tiff` in `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, rasters: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            rasters,
        }
    }

    pub fn from_settings(input: &InputSettings) -> Self {
        Self::new(&input.data_dir, input.rasters.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File names in processing order.
    pub fn file_names(&self) -> Result<Vec<String>> {
        if !self.rasters.is_empty() {
            return Ok(self.rasters.clone());
        }

        let entries = std::fs::read_dir(&self.data_dir).map_err(|e| {
            ProcessingError::Configuration(format!(
                "Cannot list raster directory {}: {}",
                self.data_dir.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_tiff(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        if names.is_empty() {
            return Err(ProcessingError::Configuration(format!(
                "No .tif/.tiff rasters found in {}",
                self.data_dir.display()
            )));
        }
        Ok(names)
    }

    /// Parse dates and check files exist, keeping input order.
    pub fn resolve(&self) -> Result<Vec<Acquisition<GeoTiffFile>>> {
        let names = self.file_names()?;
        let mut seen: HashMap<chrono::NaiveDate, String> = HashMap::new();
        let mut acquisitions = Vec::with_capacity(names.len());

        for name in names {
            let path = self.data_dir.join(&name);
            let date = parse_acquisition_date(&path)?;

            if let Some(previous) = seen.insert(date, name.clone()) {
                return Err(ProcessingError::Configuration(format!(
                    "Rasters '{}' and '{}' share acquisition date {}",
                    previous, name, date
                )));
            }
            if !path.is_file() {
                return Err(ProcessingError::Data(format!(
                    "Raster file {} not found",
                    path.display()
                )));
            }

            debug!(%date, path = %path.display(), "resolved acquisition");
            acquisitions.push(Acquisition::new(date, GeoTiffFile::new(path)));
        }

        Ok(acquisitions)
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_resolve_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2025-04-25.tiff");
        touch(dir.path(), "2025-02-02.tiff");

        let catalog = AcquisitionCatalog::new(
            dir.path(),
            vec!["2025-04-25.tiff".to_string(), "2025-02-02.tiff".to_string()],
        );
        let acquisitions = catalog.resolve().unwrap();

        let dates: Vec<NaiveDate> = acquisitions.iter().map(|a| a.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 4, 25).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 2).unwrap(),
            ]
        );
        assert_eq!(
            acquisitions[1].source.path(),
            dir.path().join("2025-02-02.tiff")
        );
    }

    #[test]
    fn test_discovery_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "S2_20250314.TIF");
        touch(dir.path(), "2025-02-02.tiff");
        touch(dir.path(), "notes.txt");

        let catalog = AcquisitionCatalog::new(dir.path(), Vec::new());
        assert_eq!(
            catalog.file_names().unwrap(),
            vec!["2025-02-02.tiff".to_string(), "S2_20250314.TIF".to_string()]
        );
        assert_eq!(catalog.resolve().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let dir = TempDir::new().unwrap();
        let catalog = AcquisitionCatalog::new(dir.path(), vec!["2025-02-02.tiff".to_string()]);

        let err = catalog.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2025-02-02.tiff");
        touch(dir.path(), "S2_20250202.tif");

        let catalog = AcquisitionCatalog::new(
            dir.path(),
            vec!["2025-02-02.tiff".to_string(), "S2_20250202.tif".to_string()],
        );
        let err = catalog.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_undated_name_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "latest.tiff");

        let catalog = AcquisitionCatalog::new(dir.path(), vec!["latest.tiff".to_string()]);
        assert_eq!(
            catalog.resolve().unwrap_err().kind(),
            ErrorKind::Configuration
        );
    }
}
