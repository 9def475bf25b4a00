use crate::error::{ProcessingError, Result};
use crate::models::{GeoTransform, RasterImage};
use crate::readers::RasterSource;
use crate::utils::constants::EPSG_WGS84;
use crate::utils::projection::{parse_utm_epsg, CoordTransformer};
use geo::{BoundingRect, Contains, Point, Polygon};
use ndarray::{s, Axis};
use tracing::debug;

/// Pixel window of a clip, in source raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

/// Band stack cropped to a buffer's bounding window, nodata outside the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedRaster {
    pub image: RasterImage,
    pub window: PixelWindow,
}

impl ClippedRaster {
    pub fn transform(&self) -> &GeoTransform {
        self.image.transform()
    }

    /// Pixels whose centre lies inside the buffer and whose reference band is valid.
    pub fn inside_count(&self, nodata: i32) -> usize {
        self.image
            .data()
            .index_axis(Axis(0), crate::utils::constants::REFERENCE_BAND)
            .iter()
            .filter(|&&v| v != nodata)
            .count()
    }
}

/// Crops rasters to buffer polygons, keeping pixels whose centre falls inside.
#[derive(Debug, Clone, Copy)]
pub struct RasterClipper {
    nodata: i32,
}

impl RasterClipper {
    pub fn new(nodata: i32) -> Self {
        Self { nodata }
    }

    /// Load `source` and clip it to a WGS84 polygon.
    ///
    /// The polygon is reprojected into the raster's UTM zone when the raster
    /// declares one; the imagery itself is never resampled.
    pub fn clip<S: RasterSource + ?Sized>(
        &self,
        source: &S,
        polygon: &Polygon<f64>,
    ) -> Result<ClippedRaster> {
        let image = source.load()?;
        let polygon = to_raster_crs(polygon, image.meta().epsg)?;
        self.clip_image(&image, &polygon, &source.name())
    }

    /// Clip an already loaded raster to a polygon in the raster's CRS.
    pub fn clip_image(
        &self,
        image: &RasterImage,
        polygon: &Polygon<f64>,
        name: &str,
    ) -> Result<ClippedRaster> {
        let window = self.window(image, polygon).ok_or_else(|| ProcessingError::NoOverlap {
            raster: name.to_string(),
        })?;

        let file_nodata = image.meta().nodata.filter(|&v| v != self.nodata);
        let mut data = image
            .data()
            .slice(s![
                ..,
                window.row_off..window.row_off + window.height,
                window.col_off..window.col_off + window.width
            ])
            .to_owned();
        if let Some(file_nodata) = file_nodata {
            data.mapv_inplace(|v| if v == file_nodata { self.nodata } else { v });
        }

        let transform = image.transform().window(window.col_off, window.row_off);
        for row in 0..window.height {
            for col in 0..window.width {
                let (x, y) = transform.pixel_to_geo(col, row);
                if !polygon.contains(&Point::new(x, y)) {
                    data.slice_mut(s![.., row, col]).fill(self.nodata);
                }
            }
        }

        let meta = image
            .meta()
            .clone()
            .with_transform(transform)
            .with_nodata(Some(self.nodata));
        let clipped = ClippedRaster {
            image: RasterImage::new(data, meta)?,
            window,
        };

        debug!(
            raster = name,
            col_off = window.col_off,
            row_off = window.row_off,
            width = window.width,
            height = window.height,
            inside = clipped.inside_count(self.nodata),
            "clipped raster"
        );
        Ok(clipped)
    }

    /// Smallest pixel window covering the polygon's bounds, intersected with the raster.
    pub fn window(&self, image: &RasterImage, polygon: &Polygon<f64>) -> Option<PixelWindow> {
        let rect = polygon.bounding_rect()?;
        let transform = image.transform();
        let (rows, cols) = image.shape();

        let corners = [
            transform.geo_to_pixel(rect.min().x, rect.min().y),
            transform.geo_to_pixel(rect.min().x, rect.max().y),
            transform.geo_to_pixel(rect.max().x, rect.min().y),
            transform.geo_to_pixel(rect.max().x, rect.max().y),
        ];
        if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
            return None;
        }

        let col_min = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let col_max = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let row_min = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let row_max = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        let col_start = col_min.floor().max(0.0);
        let col_end = col_max.ceil().min(cols as f64);
        let row_start = row_min.floor().max(0.0);
        let row_end = row_max.ceil().min(rows as f64);
        if col_start >= col_end || row_start >= row_end {
            return None;
        }

        Some(PixelWindow {
            col_off: col_start as usize,
            row_off: row_start as usize,
            width: (col_end - col_start) as usize,
            height: (row_end - row_start) as usize,
        })
    }
}

/// Express a WGS84 polygon in the CRS a raster declares.
pub fn to_raster_crs(polygon: &Polygon<f64>, raster_epsg: Option<u32>) -> Result<Polygon<f64>> {
    match raster_epsg {
        None | Some(EPSG_WGS84) => Ok(polygon.clone()),
        Some(epsg) if parse_utm_epsg(epsg).is_some() => {
            CoordTransformer::new(EPSG_WGS84, epsg)?.transform_polygon(polygon)
        }
        Some(epsg) => Err(ProcessingError::UnsupportedCrs { epsg }),
    }
}
