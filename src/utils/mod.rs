pub mod constants;
pub mod filename;
pub mod progress;
pub mod projection;

pub use constants::*;
pub use filename::{generate_default_output_filename, parse_acquisition_date};
pub use progress::ProgressReporter;
pub use projection::{parse_utm_epsg, utm_epsg_for, CoordTransformer};
