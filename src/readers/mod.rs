pub mod catalog;
pub mod points_reader;
pub mod raster_reader;

pub use catalog::AcquisitionCatalog;
pub use points_reader::PointsReader;
pub use raster_reader::{epsg_from_geokeys, GeoTiffFile, GeoTiffReader, RasterSource};
