use crate::error::{ProcessingError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Mean NDVI per acquisition date (rows, ascending) and location (columns, input order).
///
/// `None` marks a date on which a location had no valid pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dates in chronological order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Rows in chronological order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(date, values)| (*date, values.as_slice()))
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Set one cell; the row is created (all missing) on first use.
    pub fn insert(&mut self, date: NaiveDate, column: usize, value: Option<f64>) -> Result<()> {
        if column >= self.columns.len() {
            return Err(ProcessingError::Data(format!(
                "Column {} out of range for table with {} columns",
                column,
                self.columns.len()
            )));
        }
        let width = self.columns.len();
        let row = self.rows.entry(date).or_insert_with(|| vec![None; width]);
        row[column] = value;
        Ok(())
    }

    /// Replace a whole row.
    pub fn insert_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(ProcessingError::Data(format!(
                "Row for {} has {} values, expected {}",
                date,
                values.len(),
                self.columns.len()
            )));
        }
        self.rows.insert(date, values);
        Ok(())
    }

    pub fn value(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows.get(&date).and_then(|row| row[index])
    }

    /// One location's series, chronologically.
    pub fn series(&self, column: usize) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows
            .iter()
            .map(|(date, row)| (*date, row.get(column).copied().flatten()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_rows_sorted_regardless_of_insert_order() -> Result<()> {
        let mut table = ResultTable::new(vec!["0".to_string(), "1".to_string()]);
        table.insert(date(4, 25), 0, Some(4100.0))?;
        table.insert(date(2, 2), 1, Some(2300.0))?;
        table.insert(date(3, 14), 0, None)?;

        let dates: Vec<NaiveDate> = table.dates().collect();
        assert_eq!(dates, vec![date(2, 2), date(3, 14), date(4, 25)]);
        assert_eq!(table.value(date(2, 2), "1"), Some(2300.0));
        assert_eq!(table.value(date(2, 2), "0"), None);
        assert_eq!(table.value(date(3, 14), "0"), None);
        Ok(())
    }

    #[test]
    fn test_out_of_range_column_rejected() {
        let mut table = ResultTable::new(vec!["a".to_string()]);
        assert!(table.insert(date(2, 2), 1, Some(1.0)).is_err());
        assert!(table.insert_row(date(2, 2), vec![None, None]).is_err());
    }

    #[test]
    fn test_series_extraction() -> Result<()> {
        let mut table = ResultTable::new(vec!["a".to_string(), "b".to_string()]);
        table.insert_row(date(5, 13), vec![Some(1.0), None])?;
        table.insert_row(date(2, 2), vec![Some(2.0), Some(3.0)])?;

        assert_eq!(
            table.series(1),
            vec![(date(2, 2), Some(3.0)), (date(5, 13), None)]
        );
        Ok(())
    }
}
