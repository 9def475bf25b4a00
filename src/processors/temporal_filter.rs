use crate::error::{ProcessingError, Result};
use crate::models::{MaskedNdvi, NdviRaster};
use ndarray::{Array2, Array3, Axis, Zip};

/// Across-date statistics of one pixel, ignoring missing observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    /// Population standard deviation
    pub std: f64,
    pub max: f64,
    pub count: usize,
}

impl PixelStats {
    /// `None` when every observation is missing.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<i32>>,
    {
        let observed: Vec<f64> = values.into_iter().flatten().map(f64::from).collect();
        if observed.is_empty() {
            return None;
        }
        let n = observed.len() as f64;
        let mean = observed.iter().sum::<f64>() / n;
        let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            std: variance.sqrt(),
            max,
            count: observed.len(),
        })
    }
}

/// Suppresses pixels that are flat and never green across the series,
/// the signature of built-up surfaces.
#[derive(Debug, Clone, Copy)]
pub struct TemporalFilter {
    std_threshold: i32,
    min_threshold: i32,
}

impl TemporalFilter {
    pub fn new(std_threshold: i32, min_threshold: i32) -> Self {
        Self {
            std_threshold,
            min_threshold,
        }
    }

    /// A pixel is vegetation if its std exceeds the std threshold or its
    /// max exceeds the minimum NDVI threshold.
    pub fn is_vegetation(&self, stats: Option<PixelStats>) -> bool {
        match stats {
            Some(s) => s.std > f64::from(self.std_threshold) || s.max > f64::from(self.min_threshold),
            None => false,
        }
    }

    /// Stack one buffer's series into `(date, row, col)` with missing values as `None`.
    pub fn stack(&self, series: &[NdviRaster]) -> Result<Array3<Option<i32>>> {
        let Some(first) = series.first() else {
            return Ok(Array3::from_elem((0, 0, 0), None));
        };
        let (rows, cols) = first.shape();

        let mut stacked = Array3::from_elem((series.len(), rows, cols), None);
        for (mut layer, raster) in stacked.axis_iter_mut(Axis(0)).zip(series) {
            if raster.shape() != (rows, cols) {
                return Err(ProcessingError::ShapeMismatch {
                    expected: (rows, cols),
                    actual: raster.shape(),
                });
            }
            layer.assign(&raster.to_masked().data);
        }
        Ok(stacked)
    }

    /// Per-pixel vegetation mask shared by every date of the series.
    pub fn vegetation_mask(&self, series: &[NdviRaster]) -> Result<Array2<bool>> {
        let stacked = self.stack(series)?;
        let (_, rows, cols) = stacked.dim();

        let mut mask = Array2::from_elem((rows, cols), false);
        for ((row, col), keep) in mask.indexed_iter_mut() {
            let values = stacked.slice(ndarray::s![.., row, col]);
            *keep = self.is_vegetation(PixelStats::from_values(values.iter().copied()));
        }
        Ok(mask)
    }

    /// Apply the mask to every date; output keeps input order.
    pub fn apply(&self, series: &[NdviRaster]) -> Result<Vec<MaskedNdvi>> {
        let mask = self.vegetation_mask(series)?;

        Ok(series
            .iter()
            .map(|raster| {
                let mut masked = raster.to_masked();
                Zip::from(&mut masked.data).and(&mask).for_each(|value, &keep| {
                    if !keep {
                        *value = None;
                    }
                });
                masked
            })
            .collect())
    }
}
