pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::error::{ProcessingError, Result};
use crate::models::{OutputFormat, ResultTable};
use std::path::Path;
use tracing::info;

/// Write the table in `format`, creating the parent directory if needed.
pub fn write_table(
    table: &ResultTable,
    path: &Path,
    format: OutputFormat,
    compression: &str,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Csv => CsvWriter::new().write_table(table, path)?,
        OutputFormat::Parquet => ParquetWriter::new()
            .with_compression(compression)?
            .write_table(table, path)?,
    }

    info!(
        path = %path.display(),
        format = format.extension(),
        rows = table.num_rows(),
        columns = table.num_columns(),
        "wrote result table"
    );
    Ok(())
}

/// Read a result table, picking the format from the file extension.
pub fn read_table(path: &Path) -> Result<ResultTable> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Csv) => CsvWriter::new().read_table(path),
        Some(OutputFormat::Parquet) => ParquetWriter::new().read_table(path),
        None => Err(ProcessingError::Configuration(format!(
            "Cannot tell the format of {} (expected .csv or .parquet)",
            path.display()
        ))),
    }
}
