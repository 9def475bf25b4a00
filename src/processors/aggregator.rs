use crate::error::{ProcessingError, Result};
use crate::models::{MaskedNdvi, ResultTable};
use crate::processors::CoverageCounts;
use chrono::NaiveDate;
use tracing::warn;

/// One date of one buffer's processed series.
#[derive(Debug, Clone, PartialEq)]
pub struct DateObservation {
    pub date: NaiveDate,
    pub mean: Option<f64>,
    pub coverage: CoverageCounts,
}

/// Processed series of one buffer, in acquisition input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSeries {
    pub index: usize,
    pub id: String,
    pub observations: Vec<DateObservation>,
}

/// Mean of the valid pixels; `None` when none are valid.
pub fn spatial_mean(ndvi: &MaskedNdvi) -> Option<f64> {
    let (sum, count) = ndvi
        .data
        .iter()
        .flatten()
        .fold((0.0f64, 0usize), |(sum, count), &v| (sum + f64::from(v), count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Reduces per-buffer series into the date-by-location table.
pub struct Aggregator;

impl Aggregator {
    /// Columns follow buffer index order; rows are sorted by date.
    pub fn assemble(columns: Vec<String>, series: &[BufferSeries]) -> Result<ResultTable> {
        let mut table = ResultTable::new(columns);

        for buffer in series {
            if table.columns().get(buffer.index) != Some(&buffer.id) {
                return Err(ProcessingError::Data(format!(
                    "Buffer {} ('{}') has no matching result column",
                    buffer.index, buffer.id
                )));
            }
            for observation in &buffer.observations {
                if observation.mean.is_none() {
                    warn!(
                        location = %buffer.id,
                        date = %observation.date,
                        "no valid NDVI pixels, mean is missing"
                    );
                }
                table.insert(observation.date, buffer.index, observation.mean)?;
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoTransform;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn masked(data: ndarray::Array2<Option<i32>>) -> MaskedNdvi {
        MaskedNdvi {
            data,
            transform: GeoTransform::default(),
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn observation(date: NaiveDate, mean: Option<f64>) -> DateObservation {
        DateObservation {
            date,
            mean,
            coverage: CoverageCounts::default(),
        }
    }

    #[test]
    fn test_mean_ignores_missing() {
        let ndvi = masked(array![[Some(1000), None], [Some(3000), Some(5000)]]);
        assert_eq!(spatial_mean(&ndvi), Some(3000.0));
    }

    #[test]
    fn test_all_missing_mean_is_none() {
        let ndvi = masked(array![[None, None], [None, None]]);
        assert_eq!(spatial_mean(&ndvi), None);
        assert_eq!(spatial_mean(&masked(ndarray::Array2::from_elem((0, 0), None))), None);
    }

    #[test]
    fn test_single_valid_pixel() {
        let ndvi = masked(array![[None, Some(-1234)], [None, None]]);
        assert_eq!(spatial_mean(&ndvi), Some(-1234.0));
    }

    #[test]
    fn test_assemble_sorts_dates() {
        let series = vec![
            BufferSeries {
                index: 0,
                id: "a".to_string(),
                observations: vec![
                    observation(date(5, 13), Some(4000.0)),
                    observation(date(2, 2), None),
                ],
            },
            BufferSeries {
                index: 1,
                id: "b".to_string(),
                observations: vec![
                    observation(date(5, 13), Some(3500.0)),
                    observation(date(2, 2), Some(2500.0)),
                ],
            },
        ];

        let table =
            Aggregator::assemble(vec!["a".to_string(), "b".to_string()], &series).unwrap();
        let rows: Vec<(NaiveDate, Vec<Option<f64>>)> =
            table.rows().map(|(d, v)| (d, v.to_vec())).collect();

        assert_eq!(
            rows,
            vec![
                (date(2, 2), vec![None, Some(2500.0)]),
                (date(5, 13), vec![Some(4000.0), Some(3500.0)]),
            ]
        );
    }

    #[test]
    fn test_assemble_rejects_unknown_buffer() {
        let series = vec![BufferSeries {
            index: 3,
            id: "x".to_string(),
            observations: Vec::new(),
        }];
        assert!(Aggregator::assemble(vec!["a".to_string()], &series).is_err());
    }
}
