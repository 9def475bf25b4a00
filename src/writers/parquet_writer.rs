use crate::error::{ProcessingError, Result};
use crate::models::ResultTable;
use crate::utils::constants::*;
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Configuration(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write the table: a `date` column plus one nullable Float64 column per location.
    pub fn write_table(&self, table: &ResultTable, path: &Path) -> Result<()> {
        let schema = self.create_schema(table)?;
        let batch = self.table_to_batch(table, schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self, table: &ResultTable) -> Result<Arc<Schema>> {
        let mut fields = vec![Field::new(DATE_COLUMN, DataType::Date32, false)];
        for column in table.columns() {
            if column == DATE_COLUMN {
                return Err(ProcessingError::Configuration(format!(
                    "Location id '{}' clashes with the date column",
                    column
                )));
            }
            fields.push(Field::new(column, DataType::Float64, true));
        }

        Ok(Arc::new(Schema::new(fields)))
    }

    fn table_to_batch(&self, table: &ResultTable, schema: Arc<Schema>) -> Result<RecordBatch> {
        let dates: Vec<i32> = table.dates().map(days_since_epoch).collect();

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns() + 1);
        arrays.push(Arc::new(Date32Array::from(dates)));
        for column in 0..table.num_columns() {
            let values: Vec<Option<f64>> = table.rows().map(|(_, row)| row[column]).collect();
            arrays.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Read a table previously written by [`ParquetWriter::write_table`].
    pub fn read_table(&self, path: &Path) -> Result<ResultTable> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let schema = builder.schema().clone();
        let Some((date_field, value_fields)) = schema.fields().split_first() else {
            return Err(ProcessingError::Data(format!(
                "{} has no columns",
                path.display()
            )));
        };
        if date_field.name() != DATE_COLUMN || date_field.data_type() != &DataType::Date32 {
            return Err(ProcessingError::Data(format!(
                "{}: first column must be a Date32 '{}' column",
                path.display(),
                DATE_COLUMN
            )));
        }

        let columns: Vec<String> = value_fields.iter().map(|f| f.name().clone()).collect();
        let mut table = ResultTable::new(columns);

        for batch in builder.build()? {
            let batch = batch?;
            let dates = batch
                .column(0)
                .as_any()
                .downcast_ref::<Date32Array>()
                .ok_or_else(|| ProcessingError::Data("Invalid date column type".to_string()))?;

            let mut value_columns = Vec::with_capacity(batch.num_columns() - 1);
            for (i, field) in value_fields.iter().enumerate() {
                let values = batch
                    .column(i + 1)
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        ProcessingError::Data(format!("Invalid column type for '{}'", field.name()))
                    })?;
                value_columns.push(values);
            }

            for row in 0..batch.num_rows() {
                let date = date_from_days(dates.value(row))?;
                let values = value_columns
                    .iter()
                    .map(|c| (!c.is_null(row)).then(|| c.value(row)))
                    .collect();
                table.insert_row(date, values)?;
            }
        }

        Ok(table)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let mut row_group_sizes = Vec::new();
        let mut compression = None;
        for i in 0..row_groups {
            let rg_metadata = metadata.row_group(i);
            row_group_sizes.push(rg_metadata.num_rows());
            if compression.is_none() && rg_metadata.num_columns() > 0 {
                compression = Some(rg_metadata.column(0).compression());
            }
        }

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: compression.unwrap_or(self.compression),
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

// `NaiveDate::default()` is 1970-01-01
fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn date_from_days(days: i32) -> Result<NaiveDate> {
    NaiveDate::default()
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| ProcessingError::Data(format!("Date32 value {} is out of range", days)))
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn sample_table() -> ResultTable {
        let mut table = ResultTable::new(vec!["0".to_string(), "1".to_string()]);
        let d = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        table
            .insert_row(d(3, 14), vec![Some(4210.5), None])
            .unwrap();
        table
            .insert_row(d(2, 2), vec![Some(3877.25), Some(2950.0)])
            .unwrap();
        table
    }

    #[test]
    fn test_write_and_read_table() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let table = sample_table();

        writer.write_table(&table, temp_file.path())?;
        let read_back = writer.read_table(temp_file.path())?;

        assert_eq!(read_back, table);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_table(&sample_table(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);

            let info = writer.get_file_info(temp_file.path())?;
            assert_eq!(info.total_rows, 2);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }

    #[test]
    fn test_default_row_grouping() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_table(&sample_table(), temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.row_groups, 1);
        assert_eq!(info.row_group_sizes, vec![2]);
        assert_eq!(info.compression, Compression::SNAPPY);
        Ok(())
    }

    #[test]
    fn test_empty_table_round_trip() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let table = ResultTable::new(vec!["a".to_string()]);

        writer.write_table(&table, temp_file.path())?;
        let read_back = writer.read_table(temp_file.path())?;
        assert_eq!(read_back.columns(), &["a".to_string()]);
        assert!(read_back.is_empty());
        Ok(())
    }

    #[test]
    fn test_date_column_name_clash() {
        let table = ResultTable::new(vec!["date".to_string()]);
        let temp_file = NamedTempFile::new().unwrap();
        assert!(ParquetWriter::new()
            .write_table(&table, temp_file.path())
            .is_err());
    }

    #[test]
    fn test_epoch_conversion() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 2).unwrap();
        assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(date_from_days(days_since_epoch(date)).unwrap(), date);
    }
}
