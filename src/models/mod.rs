pub mod acquisition;
pub mod geotransform;
pub mod location;
pub mod ndvi;
pub mod raster;
pub mod result_table;
pub mod settings;

pub use acquisition::Acquisition;
pub use geotransform::GeoTransform;
pub use location::{BufferGeometry, PointLocation};
pub use ndvi::{MaskedNdvi, NdviRaster};
pub use raster::{PixelType, RasterImage, RasterMeta};
pub use result_table::ResultTable;
pub use settings::{
    AcquisitionSettings, InputSettings, OutputFormat, OutputSettings, PipelineConfig, Settings,
};
