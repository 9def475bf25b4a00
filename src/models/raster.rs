use crate::error::{ProcessingError, Result};
use crate::models::GeoTransform;
use ndarray::{Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Integer sample type of a source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PixelType::U8 => "uint8",
            PixelType::I8 => "int8",
            PixelType::U16 => "uint16",
            PixelType::I16 => "int16",
            PixelType::U32 => "uint32",
            PixelType::I32 => "int32",
        };
        f.write_str(name)
    }
}

/// Raster metadata carried alongside pixel arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMeta {
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub pixel_type: PixelType,
    pub nodata: Option<i32>,
    pub transform: GeoTransform,
    pub epsg: Option<u32>,
}

impl RasterMeta {
    pub fn new(width: usize, height: usize, band_count: usize, pixel_type: PixelType) -> Self {
        Self {
            driver: "GTiff".to_string(),
            width,
            height,
            band_count,
            pixel_type,
            nodata: None,
            transform: GeoTransform::default(),
            epsg: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<i32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }
}

/// Band-stacked raster: `(band, row, col)` samples plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    data: Array3<i32>,
    meta: RasterMeta,
}

impl RasterImage {
    /// Wraps pixel data, syncing the metadata dimensions to the array.
    pub fn new(data: Array3<i32>, mut meta: RasterMeta) -> Result<Self> {
        let (bands, rows, cols) = data.dim();
        if bands == 0 {
            return Err(ProcessingError::Data("Raster has no bands".to_string()));
        }
        meta.band_count = bands;
        meta.height = rows;
        meta.width = cols;
        Ok(Self { data, meta })
    }

    pub fn data(&self) -> &Array3<i32> {
        &self.data
    }

    pub fn into_data(self) -> Array3<i32> {
        self.data
    }

    pub fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.meta.transform
    }

    /// Borrow one band, failing with a configuration error when the index is out of range.
    pub fn band(&self, index: usize, role: &'static str) -> Result<ArrayView2<'_, i32>> {
        self.check_band(index, role)?;
        Ok(self.data.index_axis(Axis(0), index))
    }

    pub fn check_band(&self, index: usize, role: &'static str) -> Result<()> {
        let band_count = self.band_count();
        if index >= band_count {
            return Err(ProcessingError::BandIndex {
                role,
                index,
                band_count,
            });
        }
        Ok(())
    }

    /// Rebuild with new data of the same shape, keeping metadata.
    pub fn with_data(&self, data: Array3<i32>) -> Result<Self> {
        if data.dim() != self.data.dim() {
            let (_, rows, cols) = data.dim();
            return Err(ProcessingError::ShapeMismatch {
                expected: self.shape(),
                actual: (rows, cols),
            });
        }
        Ok(Self {
            data,
            meta: self.meta.clone(),
        })
    }
}
