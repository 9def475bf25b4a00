use geo::Polygon;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A monitored location read from the points table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PointLocation {
    /// Row position in the input table; defines column order in the result.
    pub index: usize,

    #[validate(length(min = 1))]
    pub id: String,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
}

impl PointLocation {
    pub fn new(index: usize, id: String, longitude: f64, latitude: f64) -> Self {
        Self {
            index,
            id,
            longitude,
            latitude,
        }
    }
}

/// Disc around a location, in WGS84 longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferGeometry {
    pub location: PointLocation,
    pub radius_m: f64,
    /// Projected CRS the disc was constructed in.
    pub projected_epsg: u32,
    pub polygon: Polygon<f64>,
}

impl BufferGeometry {
    pub fn id(&self) -> &str {
        &self.location.id
    }

    pub fn index(&self) -> usize {
        self.location.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_validation() {
        let location = PointLocation::new(0, "0".to_string(), 14.45, 35.88);
        assert!(location.validate().is_ok());

        let invalid = PointLocation::new(1, "1".to_string(), 14.45, 95.0);
        assert!(invalid.validate().is_err());

        let unnamed = PointLocation::new(2, String::new(), 14.45, 35.88);
        assert!(unnamed.validate().is_err());
    }
}
