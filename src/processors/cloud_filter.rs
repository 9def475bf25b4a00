use crate::error::Result;
use crate::models::RasterImage;
use ndarray::{Axis, Zip};

/// Masks every band of pixels whose cloud probability reaches the threshold.
#[derive(Debug, Clone, Copy)]
pub struct CloudFilter {
    threshold: i32,
    cloud_band: usize,
    nodata: i32,
}

impl CloudFilter {
    pub fn new(threshold: i32, cloud_band: usize, nodata: i32) -> Self {
        Self {
            threshold,
            cloud_band,
            nodata,
        }
    }

    /// Probabilities strictly below the threshold pass through unchanged.
    pub fn apply(&self, image: &RasterImage) -> Result<RasterImage> {
        let cloud = image.band(self.cloud_band, "cloud probability")?;
        let mut data = image.data().to_owned();

        for mut band in data.axis_iter_mut(Axis(0)) {
            Zip::from(&mut band).and(&cloud).for_each(|value, &prob| {
                if prob >= self.threshold {
                    *value = self.nodata;
                }
            });
        }

        image.with_data(data)
    }

    pub fn is_clear(&self, probability: i32) -> bool {
        probability < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::models::{PixelType, RasterMeta};
    use ndarray::{array, Array3};

    const NODATA: i32 = 32767;

    fn image(cloud: [[i32; 3]; 2]) -> RasterImage {
        let mut data = Array3::from_elem((3, 2, 3), 1200);
        for r in 0..2 {
            for c in 0..3 {
                data[[2, r, c]] = cloud[r][c];
            }
        }
        RasterImage::new(data, RasterMeta::new(3, 2, 3, PixelType::U16)).unwrap()
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let filter = CloudFilter::new(50, 2, NODATA);
        let filtered = filter.apply(&image([[0, 49, 50], [51, 100, 10]])).unwrap();

        let reflectance = filtered.data().index_axis(Axis(0), 0).to_owned();
        assert_eq!(
            reflectance,
            array![[1200, 1200, NODATA], [NODATA, NODATA, 1200]]
        );

        // every band of a cloudy pixel is masked
        for band in 0..3 {
            assert_eq!(filtered.data()[[band, 0, 2]], NODATA);
        }
        assert_eq!(filtered.data()[[2, 0, 1]], 49);
    }

    #[test]
    fn test_idempotent() {
        let filter = CloudFilter::new(50, 2, NODATA);
        let once = filter.apply(&image([[0, 60, 50], [20, 99, 10]])).unwrap();
        let twice = filter.apply(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_nodata_iff_cloudy() {
        let filter = CloudFilter::new(30, 2, NODATA);
        let input = image([[0, 29, 30], [31, 100, 5]]);
        let filtered = filter.apply(&input).unwrap();

        for r in 0..2 {
            for c in 0..3 {
                let prob = input.data()[[2, r, c]];
                let out = filtered.data()[[0, r, c]];
                assert_eq!(out == NODATA, !filter.is_clear(prob));
                if filter.is_clear(prob) {
                    assert_eq!(out, input.data()[[0, r, c]]);
                }
            }
        }
    }

    #[test]
    fn test_missing_cloud_band() {
        let filter = CloudFilter::new(50, 12, NODATA);
        let err = filter.apply(&image([[0; 3]; 2])).unwrap_err();
        assert!(matches!(err, ProcessingError::BandIndex { index: 12, .. }));
    }
}
