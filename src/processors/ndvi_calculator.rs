use crate::error::Result;
use crate::models::{NdviRaster, RasterImage};
use crate::utils::constants::{NDVI_SCALE, REFERENCE_BAND};
use ndarray::{Array2, Zip};

/// Computes `round(10000 * (NIR - RED) / (NIR + RED))` per pixel.
#[derive(Debug, Clone, Copy)]
pub struct NdviCalculator {
    red_band: usize,
    nir_band: usize,
    nodata: i32,
}

impl NdviCalculator {
    pub fn new(red_band: usize, nir_band: usize, nodata: i32) -> Self {
        Self {
            red_band,
            nir_band,
            nodata,
        }
    }

    /// Pixels with a nodata reference band stay nodata, as do pixels where
    /// NIR + RED is zero.
    pub fn compute(&self, image: &RasterImage) -> Result<NdviRaster> {
        let reference = image.band(REFERENCE_BAND, "reference")?;
        let red = image.band(self.red_band, "red")?;
        let nir = image.band(self.nir_band, "near-infrared")?;

        let mut ndvi = Array2::from_elem(image.shape(), self.nodata);
        Zip::from(&mut ndvi)
            .and(&reference)
            .and(&red)
            .and(&nir)
            .for_each(|out, &reference, &red, &nir| {
                if reference != self.nodata {
                    if let Some(value) = self.index(red, nir) {
                        *out = value;
                    }
                }
            });

        Ok(NdviRaster::new(ndvi, self.nodata, *image.transform()))
    }

    /// Scaled index for one pixel; `None` when undefined.
    pub fn index(&self, red: i32, nir: i32) -> Option<i32> {
        let sum = f64::from(nir) + f64::from(red);
        if sum == 0.0 {
            return None;
        }
        let value = (NDVI_SCALE * (f64::from(nir) - f64::from(red)) / sum).round();
        Some(value as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PixelType, RasterMeta};
    use crate::utils::constants::{NDVI_MAX, NDVI_MIN};
    use ndarray::{array, Array3};

    const NODATA: i32 = 32767;

    fn stack(reference: i32, red: i32, nir: i32) -> RasterImage {
        let mut data = Array3::zeros((3, 1, 1));
        data[[0, 0, 0]] = reference;
        data[[1, 0, 0]] = red;
        data[[2, 0, 0]] = nir;
        RasterImage::new(data, RasterMeta::new(1, 1, 3, PixelType::U16)).unwrap()
    }

    fn ndvi_of(reference: i32, red: i32, nir: i32) -> i32 {
        NdviCalculator::new(1, 2, NODATA)
            .compute(&stack(reference, red, nir))
            .unwrap()
            .data[[0, 0]]
    }

    #[test]
    fn test_known_values() {
        assert_eq!(ndvi_of(1, 1000, 3000), 5000);
        assert_eq!(ndvi_of(1, 3000, 1000), -5000);
        assert_eq!(ndvi_of(1, 0, 2500), 10000);
        // 10000 * 200 / 2800 = 714.28...
        assert_eq!(ndvi_of(1, 1300, 1500), 714);
    }

    #[test]
    fn test_equal_bands_give_zero() {
        for v in [1, 17, 4000, 30000] {
            assert_eq!(ndvi_of(1, v, v), 0);
        }
    }

    #[test]
    fn test_zero_sum_is_nodata() {
        assert_eq!(ndvi_of(1, 0, 0), NODATA);
    }

    #[test]
    fn test_reference_band_masks() {
        assert_eq!(ndvi_of(NODATA, 1000, 3000), NODATA);
        assert_eq!(ndvi_of(0, 1000, 3000), 5000);
    }

    #[test]
    fn test_output_range_for_reflectances() {
        let calc = NdviCalculator::new(1, 2, NODATA);
        for red in (0..=10_000).step_by(997) {
            for nir in (0..=10_000).step_by(1009) {
                if let Some(v) = calc.index(red, nir) {
                    assert!((NDVI_MIN..=NDVI_MAX).contains(&v), "{red}/{nir} -> {v}");
                }
            }
        }
    }

    #[test]
    fn test_shape_and_transform_preserved() {
        let data = Array3::from_shape_vec(
            (3, 2, 2),
            vec![1, 1, NODATA, 1, 100, 200, 300, 400, 300, 200, 100, 400],
        )
        .unwrap();
        let image = RasterImage::new(data, RasterMeta::new(2, 2, 3, PixelType::U16)).unwrap();
        let ndvi = NdviCalculator::new(1, 2, NODATA).compute(&image).unwrap();

        assert_eq!(ndvi.data, array![[5000, 0], [NODATA, 0]]);
        assert_eq!(ndvi.transform, *image.transform());
    }
}
