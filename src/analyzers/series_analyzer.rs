use crate::error::Result;
use crate::models::ResultTable;
use crate::utils::constants::NDVI_SCALE;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

/// Summary of one location's NDVI series, on the ×10000 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub location: String,
    pub dates: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub first: Option<(NaiveDate, f64)>,
    pub last: Option<(NaiveDate, f64)>,
}

impl SeriesSummary {
    /// Last minus first available value.
    pub fn change(&self) -> Option<f64> {
        match (self.first, self.last) {
            (Some((_, first)), Some((_, last))) => Some(last - first),
            _ => None,
        }
    }

    pub fn available(&self) -> usize {
        self.dates - self.missing
    }
}

/// Summary of a whole result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub locations: usize,
    pub dates: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub missing_values: usize,
    pub series: Vec<SeriesSummary>,
}

pub struct SeriesAnalyzer;

impl SeriesAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_file(&self, path: &Path) -> Result<TableSummary> {
        let table = crate::writers::read_table(path)?;
        Ok(self.analyze(&table))
    }

    pub fn analyze(&self, table: &ResultTable) -> TableSummary {
        let series: Vec<SeriesSummary> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| self.summarize(name, &table.series(i)))
            .collect();

        let dates: Vec<NaiveDate> = table.dates().collect();
        let date_range = dates.first().copied().zip(dates.last().copied());

        TableSummary {
            locations: table.num_columns(),
            dates: table.num_rows(),
            date_range,
            missing_values: series.iter().map(|s| s.missing).sum(),
            series,
        }
    }

    pub fn summarize(&self, location: &str, values: &[(NaiveDate, Option<f64>)]) -> SeriesSummary {
        let available: Vec<(NaiveDate, f64)> = values
            .iter()
            .filter_map(|(date, value)| value.map(|v| (*date, v)))
            .collect();

        let min = available.iter().map(|(_, v)| *v).reduce(f64::min);
        let max = available.iter().map(|(_, v)| *v).reduce(f64::max);
        let mean = (!available.is_empty())
            .then(|| available.iter().map(|(_, v)| v).sum::<f64>() / available.len() as f64);

        SeriesSummary {
            location: location.to_string(),
            dates: values.len(),
            missing: values.len() - available.len(),
            min,
            max,
            mean,
            first: available.first().copied(),
            last: available.last().copied(),
        }
    }
}

impl Default for SeriesAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn ndvi(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v / NDVI_SCALE),
        None => "n/a".to_string(),
    }
}

impl TableSummary {
    pub fn summary(&self) -> String {
        let range = match self.date_range {
            Some((start, end)) => format!("{} to {}", start, end),
            None => "no dates".to_string(),
        };

        let mut summary = format!(
            "Locations: {}\n\
            Acquisition dates: {} ({})\n\
            Missing means: {} of {}\n",
            self.locations,
            self.dates,
            range,
            self.missing_values,
            self.locations * self.dates
        );

        for s in &self.series {
            let change = match s.change() {
                Some(c) => format!("{:+.4}", c / NDVI_SCALE),
                None => "n/a".to_string(),
            };
            summary.push_str(&format!(
                "- {}: {}/{} dates, NDVI min {} max {} mean {}, change {}\n",
                s.location,
                s.available(),
                s.dates,
                ndvi(s.min),
                ndvi(s.max),
                ndvi(s.mean),
                change
            ));
        }

        summary
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
    fn test_series_statistics() {
        let values = vec![
            (d(2, 2), None),
            (d(3, 14), Some(3000.0)),
            (d(4, 25), Some(5000.0)),
            (d(5, 13), None),
            (d(7, 25), Some(2500.0)),
        ];
        let summary = SeriesAnalyzer::new().summarize("0", &values);

        assert_eq!(summary.dates, 5);
        assert_eq!(summary.missing, 2);
        assert_eq!(summary.min, Some(2500.0));
        assert_eq!(summary.max, Some(5000.0));
        assert_eq!(summary.mean, Some(3500.0));
        assert_eq!(summary.first, Some((d(3, 14), 3000.0)));
        assert_eq!(summary.last, Some((d(7, 25), 2500.0)));
        assert_eq!(summary.change(), Some(-500.0));
    }

    #[test]
    fn test_all_missing_series() {
        let summary = SeriesAnalyzer::new().summarize("x", &[(d(2, 2), None)]);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.change(), None);
        assert_eq!(summary.available(), 0);
    }

    #[test]
    fn test_table_summary() -> Result<()> {
        let mut table = ResultTable::new(vec!["a".to_string(), "b".to_string()]);
        table.insert_row(d(4, 25), vec![Some(4000.0), None])?;
        table.insert_row(d(2, 2), vec![Some(2000.0), Some(1000.0)])?;

        let summary = SeriesAnalyzer::new().analyze(&table);
        assert_eq!(summary.locations, 2);
        assert_eq!(summary.dates, 2);
        assert_eq!(summary.date_range, Some((d(2, 2), d(4, 25))));
        assert_eq!(summary.missing_values, 1);
        assert_eq!(summary.series[0].change(), Some(2000.0));

        let text = summary.summary();
        assert!(text.contains("Missing means: 1 of 4"));
        assert!(text.contains("- a: 2/2 dates"));
        assert!(text.contains("+0.2000"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["series"][1]["missing"], 1);
        Ok(())
    }
}
