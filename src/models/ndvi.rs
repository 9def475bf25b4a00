use crate::models::GeoTransform;
use ndarray::Array2;

/// Single-band NDVI raster on the ×10000 integer scale, with a nodata sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct NdviRaster {
    pub data: Array2<i32>,
    pub nodata: i32,
    pub transform: GeoTransform,
}

impl NdviRaster {
    pub fn new(data: Array2<i32>, nodata: i32, transform: GeoTransform) -> Self {
        Self {
            data,
            nodata,
            transform,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != self.nodata).count()
    }

    /// Replace the nodata sentinel with an explicit missing marker.
    pub fn to_masked(&self) -> MaskedNdvi {
        MaskedNdvi {
            data: self.data.mapv(|v| (v != self.nodata).then_some(v)),
            transform: self.transform,
        }
    }
}

/// NDVI raster where missing pixels are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedNdvi {
    pub data: Array2<Option<i32>>,
    pub transform: GeoTransform,
}

impl MaskedNdvi {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_some()).count()
    }
}
