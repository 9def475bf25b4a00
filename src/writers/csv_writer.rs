use crate::error::{ProcessingError, Result};
use crate::models::ResultTable;
use crate::utils::constants::DATE_COLUMN;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Writes the result table as `date,<location ids...>` with empty fields for missing means.
#[derive(Debug, Clone, Default)]
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_table(&self, table: &ResultTable, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(table, file)
    }

    pub fn write_to<W: Write>(&self, table: &ResultTable, writer: W) -> Result<()> {
        if table.columns().iter().any(|c| c == DATE_COLUMN) {
            return Err(ProcessingError::Configuration(format!(
                "Location id '{}' clashes with the date column",
                DATE_COLUMN
            )));
        }

        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(table.columns().iter().cloned());
        csv_writer.write_record(&header)?;

        for (date, values) in table.rows() {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(
                values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_table(&self, path: &Path) -> Result<ResultTable> {
        let file = File::open(path)?;
        self.read_from(file)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<ResultTable> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        match headers.get(0) {
            Some(first) if first == DATE_COLUMN => {}
            _ => {
                return Err(ProcessingError::Data(format!(
                    "Result table must start with a '{}' column",
                    DATE_COLUMN
                )))
            }
        }

        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut table = ResultTable::new(columns);

        for record in csv_reader.records() {
            let record = record?;
            let date = NaiveDate::parse_from_str(record.get(0).unwrap_or_default(), "%Y-%m-%d")?;
            let values = record
                .iter()
                .skip(1)
                .map(|field| {
                    if field.is_empty() {
                        return Ok(None);
                    }
                    field.parse::<f64>().map(Some).map_err(|_| {
                        ProcessingError::Data(format!("Invalid NDVI value '{}' on {}", field, date))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            table.insert_row(date, values)?;
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_csv_layout() -> Result<()> {
        let mut table = ResultTable::new(vec!["0".to_string(), "1".to_string()]);
        table.insert_row(d(4, 25), vec![Some(4100.5), Some(3000.0)])?;
        table.insert_row(d(2, 2), vec![None, Some(2500.25)])?;

        let mut buffer = Vec::new();
        CsvWriter::new().write_to(&table, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "date,0,1\n2025-02-02,,2500.25\n2025-04-25,4100.5,3000\n"
        );
        Ok(())
    }

    #[test]
    fn test_read_back() -> Result<()> {
        let mut table = ResultTable::new(vec!["Mdina".to_string()]);
        table.insert_row(d(3, 14), vec![None])?;
        table.insert_row(d(5, 13), vec![Some(-120.75)])?;

        let file = tempfile::NamedTempFile::new()?;
        let writer = CsvWriter::new();
        writer.write_table(&table, file.path())?;

        assert_eq!(writer.read_table(file.path())?, table);
        Ok(())
    }

    #[test]
    fn test_rejects_foreign_layout() {
        let data = "when,a\n2025-02-02,1\n";
        assert!(CsvWriter::new().read_from(data.as_bytes()).is_err());

        let bad_value = "date,a\n2025-02-02,green\n";
        assert!(CsvWriter::new().read_from(bad_value.as_bytes()).is_err());
    }
}
