use crate::error::{ProcessingError, Result};
use crate::models::{BufferGeometry, PipelineConfig, PointLocation};
use crate::utils::constants::EPSG_WGS84;
use crate::utils::projection::{check_utm_latitude, utm_epsg_for, CoordTransformer};
use geo::{Contains, Coord, LineString, Point, Polygon};
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::debug;

/// Builds metric disc buffers around WGS84 points via a UTM round trip.
#[derive(Debug, Clone)]
pub struct GeometryBuilder {
    buffer_distance_m: f64,
    quadrant_segments: usize,
    projected_epsg: Option<u32>,
}

/// Forward and inverse transformers for one projected CRS.
struct ProjectionPair {
    forward: CoordTransformer,
    inverse: CoordTransformer,
}

impl GeometryBuilder {
    pub fn new(buffer_distance_m: f64) -> Self {
        Self {
            buffer_distance_m,
            quadrant_segments: crate::utils::constants::DEFAULT_QUADRANT_SEGMENTS,
            projected_epsg: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            buffer_distance_m: config.buffer_distance_m,
            quadrant_segments: config.buffer_quadrant_segments,
            projected_epsg: config.projected_epsg,
        }
    }

    pub fn with_quadrant_segments(mut self, segments: usize) -> Self {
        self.quadrant_segments = segments;
        self
    }

    /// Use one projected CRS for every point instead of each point's UTM zone.
    pub fn with_projected_epsg(mut self, epsg: Option<u32>) -> Self {
        self.projected_epsg = epsg;
        self
    }

    pub fn buffer_distance_m(&self) -> f64 {
        self.buffer_distance_m
    }

    /// Buffer every location, keeping input order.
    pub fn build_all(&self, locations: &[PointLocation]) -> Result<Vec<BufferGeometry>> {
        let mut projections: HashMap<u32, ProjectionPair> = HashMap::new();
        locations
            .iter()
            .map(|location| {
                let epsg = self.projection_for(location)?;
                if !projections.contains_key(&epsg) {
                    projections.insert(epsg, ProjectionPair::new(epsg)?);
                }
                match projections.get(&epsg) {
                    Some(pair) => self.buffer_with(location, epsg, pair),
                    None => Err(ProcessingError::UnsupportedCrs { epsg }),
                }
            })
            .collect()
    }

    pub fn build(&self, location: &PointLocation) -> Result<BufferGeometry> {
        let epsg = self.projection_for(location)?;
        self.buffer_with(location, epsg, &ProjectionPair::new(epsg)?)
    }

    /// The disc in projected coordinates, with the CRS it was built in.
    pub fn projected_disc(&self, location: &PointLocation) -> Result<(u32, Polygon<f64>)> {
        let epsg = self.projection_for(location)?;
        let pair = ProjectionPair::new(epsg)?;
        let (x, y) = pair.forward.transform(location.longitude, location.latitude)?;
        Ok((epsg, self.disc(x, y)))
    }

    fn projection_for(&self, location: &PointLocation) -> Result<u32> {
        if !self.buffer_distance_m.is_finite() || self.buffer_distance_m <= 0.0 {
            return Err(ProcessingError::Configuration(format!(
                "Buffer distance must be a positive number of meters, got {}",
                self.buffer_distance_m
            )));
        }
        match self.projected_epsg {
            Some(epsg) => {
                check_utm_latitude(location.latitude)?;
                Ok(epsg)
            }
            None => utm_epsg_for(location.longitude, location.latitude),
        }
    }

    fn buffer_with(
        &self,
        location: &PointLocation,
        epsg: u32,
        pair: &ProjectionPair,
    ) -> Result<BufferGeometry> {
        let (x, y) = pair.forward.transform(location.longitude, location.latitude)?;
        let disc = self.disc(x, y);
        let polygon = pair.inverse.transform_polygon(&disc)?;

        let center = Point::new(location.longitude, location.latitude);
        if !polygon.contains(&center) {
            return Err(ProcessingError::Configuration(format!(
                "Buffer around location {} is geometrically invalid after reprojection through EPSG:{}",
                location.id, epsg
            )));
        }

        debug!(
            location = %location.id,
            epsg,
            radius_m = self.buffer_distance_m,
            "built buffer"
        );

        Ok(BufferGeometry {
            location: location.clone(),
            radius_m: self.buffer_distance_m,
            projected_epsg: epsg,
            polygon,
        })
    }

    /// Regular polygon approximating a circle, counter-clockwise and closed.
    fn disc(&self, cx: f64, cy: f64) -> Polygon<f64> {
        let n = 4 * self.quadrant_segments.max(1);
        let r = self.buffer_distance_m;
        let mut coords: Vec<Coord<f64>> = (0..n)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / n as f64;
                Coord {
                    x: cx + r * angle.cos(),
                    y: cy + r * angle.sin(),
                }
            })
            .collect();
        coords.push(coords[0]);
        Polygon::new(LineString::from(coords), vec![])
    }
}

impl ProjectionPair {
    fn new(epsg: u32) -> Result<Self> {
        Ok(Self {
            forward: CoordTransformer::new(EPSG_WGS84, epsg)?,
            inverse: CoordTransformer::new(epsg, EPSG_WGS84)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use geo::{Area, GeodesicArea};

    fn location(lon: f64, lat: f64) -> PointLocation {
        PointLocation::new(0, "0".to_string(), lon, lat)
    }

    #[test]
    fn test_geodesic_area_close_to_circle() {
        let builder = GeometryBuilder::new(1000.0);
        for d in [100.0, 500.0, 1000.0, 5000.0] {
            let builder = GeometryBuilder::new(d);
            let buffer = builder.build(&location(14.45, 35.88)).unwrap();
            let area = buffer.polygon.geodesic_area_unsigned();
            let expected = PI * d * d;
            let error = (area - expected).abs() / expected;
            assert!(error < 0.02, "radius {d}: relative area error {error}");
        }
        assert_eq!(builder.buffer_distance_m(), 1000.0);
    }

    #[test]
    fn test_vertex_count_and_zone() {
        let buffer = GeometryBuilder::new(500.0)
            .build(&location(14.45, 35.88))
            .unwrap();

        // 16 segments per quadrant plus the closing vertex
        assert_eq!(buffer.polygon.exterior().0.len(), 65);
        assert_eq!(buffer.projected_epsg, 32633);
        assert_eq!(buffer.radius_m, 500.0);
    }

    #[test]
    fn test_projected_disc_area() {
        let (epsg, disc) = GeometryBuilder::new(1000.0)
            .with_quadrant_segments(64)
            .projected_disc(&location(-3.7, 40.4))
            .unwrap();

        assert_eq!(epsg, 32630);
        let ratio = disc.unsigned_area() / (PI * 1000.0 * 1000.0);
        assert!((ratio - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_build_all_keeps_order_across_zones() {
        let locations = vec![
            PointLocation::new(0, "malta".to_string(), 14.45, 35.88),
            PointLocation::new(1, "madrid".to_string(), -3.7, 40.4),
            PointLocation::new(2, "gozo".to_string(), 14.25, 36.04),
        ];
        let buffers = GeometryBuilder::new(250.0).build_all(&locations).unwrap();

        let ids: Vec<&str> = buffers.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec!["malta", "madrid", "gozo"]);
        assert_eq!(buffers[1].projected_epsg, 32630);
        assert_eq!(buffers[2].projected_epsg, 32633);
    }

    #[test]
    fn test_fixed_projection_override() {
        let buffer = GeometryBuilder::new(500.0)
            .with_projected_epsg(Some(32633))
            .build(&location(12.1, 35.9))
            .unwrap();
        assert_eq!(buffer.projected_epsg, 32633);
    }

    #[test]
    fn test_invalid_inputs_are_configuration_errors() {
        let polar = GeometryBuilder::new(500.0)
            .build(&location(14.45, 86.0))
            .unwrap_err();
        assert_eq!(polar.kind(), ErrorKind::Configuration);

        let negative = GeometryBuilder::new(-1.0)
            .build(&location(14.45, 35.88))
            .unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::Configuration);
    }
}
