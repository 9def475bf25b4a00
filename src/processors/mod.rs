pub mod aggregator;
pub mod cloud_filter;
pub mod coverage;
pub mod geometry_builder;
pub mod ndvi_calculator;
pub mod parallel_processor;
pub mod raster_clipper;
pub mod temporal_filter;

pub use aggregator::{spatial_mean, Aggregator, BufferSeries, DateObservation};
pub use cloud_filter::CloudFilter;
pub use coverage::{CoverageCounts, CoverageEntry, CoverageReport};
pub use geometry_builder::GeometryBuilder;
pub use ndvi_calculator::NdviCalculator;
pub use parallel_processor::{ImageResult, ParallelProcessor, PipelineOutput};
pub use raster_clipper::{to_raster_crs, ClippedRaster, PixelWindow, RasterClipper};
pub use temporal_filter::{PixelStats, TemporalFilter};
