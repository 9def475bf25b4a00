use crate::error::{ProcessingError, Result};
use crate::models::PointLocation;
use crate::utils::constants::{DEFAULT_X_COLUMN, DEFAULT_Y_COLUMN};
use std::io::Read;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Reads monitored locations from a delimited table with longitude/latitude columns.
pub struct PointsReader {
    x_column: String,
    y_column: String,
    id_column: Option<String>,
}

impl PointsReader {
    pub fn new() -> Self {
        Self {
            x_column: DEFAULT_X_COLUMN.to_string(),
            y_column: DEFAULT_Y_COLUMN.to_string(),
            id_column: None,
        }
    }

    pub fn with_columns(mut self, x_column: &str, y_column: &str) -> Self {
        self.x_column = x_column.to_string();
        self.y_column = y_column.to_string();
        self
    }

    /// Take location identities from a column instead of the row index.
    pub fn with_id_column(mut self, id_column: Option<&str>) -> Self {
        self.id_column = id_column.map(str::to_string);
        self
    }

    /// Read locations from a CSV file
    pub fn read_points(&self, path: &Path) -> Result<Vec<PointLocation>> {
        let file = std::fs::File::open(path).map_err(|e| {
            ProcessingError::Configuration(format!(
                "Cannot open points table {}: {}",
                path.display(),
                e
            ))
        })?;
        let points = self.read_from(file)?;
        debug!(path = %path.display(), count = points.len(), "read point locations");
        Ok(points)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<PointLocation>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let x_idx = self.column_position(&headers, &self.x_column)?;
        let y_idx = self.column_position(&headers, &self.y_column)?;
        let id_idx = self
            .id_column
            .as_deref()
            .map(|name| self.column_position(&headers, name))
            .transpose()?;

        let mut points = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = index + 2;

            let longitude = self.parse_number(&record, x_idx, &self.x_column, line)?;
            let latitude = self.parse_number(&record, y_idx, &self.y_column, line)?;
            let id = match id_idx {
                Some(i) => record.get(i).unwrap_or_default().to_string(),
                None => index.to_string(),
            };

            let point = PointLocation::new(index, id, longitude, latitude);
            point.validate().map_err(|e| {
                ProcessingError::Configuration(format!("Invalid location on line {}: {}", line, e))
            })?;
            points.push(point);
        }

        if points.is_empty() {
            return Err(ProcessingError::Configuration(
                "Points table contains no locations".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = points.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(ProcessingError::Configuration(format!(
                "Duplicate location identity '{}'",
                dup.id
            )));
        }

        Ok(points)
    }

    fn column_position(&self, headers: &csv::StringRecord, name: &str) -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ProcessingError::Configuration(format!(
                "Points table is missing required column '{}' (found: {})",
                name,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    fn parse_number(
        &self,
        record: &csv::StringRecord,
        idx: usize,
        column: &str,
        line: usize,
    ) -> Result<f64> {
        let raw = record.get(idx).unwrap_or_default();
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ProcessingError::Configuration(format!(
                    "Invalid {} value '{}' on line {}",
                    column, raw, line
                ))
            })
    }
}

impl Default for PointsReader {
    fn default() -> Self {
        Self::new()
    }
}
