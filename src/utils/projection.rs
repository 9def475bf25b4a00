//! WGS84 ↔ UTM coordinate transforms backed by `proj4rs` (pure Rust, no libproj).
//!
//! Only geographic WGS84 (EPSG:4326) and the UTM zones on the WGS84 datum
//! (EPSG:326xx north, EPSG:327xx south) are supported.

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{EPSG_WGS84, UTM_MAX_LAT, UTM_MIN_LAT};
use geo::{Coord, LineString, Polygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

/// EPSG code of the UTM zone containing a WGS84 position.
pub fn utm_epsg_for(lon: f64, lat: f64) -> Result<u32> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ProcessingError::Configuration(format!(
            "Longitude {} is outside [-180, 180]",
            lon
        )));
    }
    check_utm_latitude(lat)?;

    let zone = (((lon + 180.0) / 6.0).floor() as u32 + 1).min(60);
    Ok(if lat >= 0.0 { 32600 + zone } else { 32700 + zone })
}

/// UTM is only defined between 80°S and 84°N.
pub fn check_utm_latitude(lat: f64) -> Result<()> {
    if !lat.is_finite() || !(UTM_MIN_LAT..=UTM_MAX_LAT).contains(&lat) {
        return Err(ProcessingError::Configuration(format!(
            "Latitude {} is outside the UTM domain [{}, {}]",
            lat, UTM_MIN_LAT, UTM_MAX_LAT
        )));
    }
    Ok(())
}

fn proj_string(epsg: u32) -> Option<String> {
    if epsg == EPSG_WGS84 {
        return Some("+proj=longlat +datum=WGS84 +no_defs".to_string());
    }
    let (zone, north) = parse_utm_epsg(epsg)?;
    let south = if north { "" } else { " +south" };
    Some(format!(
        "+proj=utm +zone={}{} +datum=WGS84 +units=m +no_defs",
        zone, south
    ))
}

/// Reusable transformer between two supported CRS.
pub struct CoordTransformer {
    source_proj: Proj,
    target_proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source_epsg", &self.source_epsg)
            .field("target_epsg", &self.target_epsg)
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source_proj = Self::build_proj(source_epsg)?;
        let target_proj = Self::build_proj(target_epsg)?;

        Ok(Self {
            source_proj,
            target_proj,
            source_epsg,
            target_epsg,
        })
    }

    fn build_proj(epsg: u32) -> Result<Proj> {
        let definition = proj_string(epsg).ok_or(ProcessingError::UnsupportedCrs { epsg })?;
        Proj::from_proj_string(&definition).map_err(|e| {
            ProcessingError::Configuration(format!("Invalid projection EPSG:{}: {:?}", epsg, e))
        })
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transform one coordinate. Geographic coordinates are in degrees.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let source_geographic = self.source_epsg == EPSG_WGS84;
        let target_geographic = self.target_epsg == EPSG_WGS84;

        let mut point = if source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source_proj, &self.target_proj, &mut point).map_err(|e| {
            ProcessingError::Configuration(format!(
                "Cannot transform ({}, {}) from EPSG:{} to EPSG:{}: {:?}",
                x, y, self.source_epsg, self.target_epsg, e
            ))
        })?;

        let (out_x, out_y) = if target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProcessingError::Configuration(format!(
                "Transform of ({}, {}) from EPSG:{} to EPSG:{} is out of bounds",
                x, y, self.source_epsg, self.target_epsg
            )));
        }

        Ok((out_x, out_y))
    }

    /// Transform every vertex of a polygon (exterior and holes).
    pub fn transform_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        let exterior = self.transform_ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.transform_ring(ring))
            .collect::<Result<Vec<_>>>()?;

        Ok(Polygon::new(exterior, interiors))
    }

    fn transform_ring(&self, ring: &LineString<f64>) -> Result<LineString<f64>> {
        let coords = ring
            .coords()
            .map(|c| self.transform(c.x, c.y).map(|(x, y)| Coord { x, y }))
            .collect::<Result<Vec<_>>>()?;
        Ok(LineString::from(coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn test_parse_utm_epsg() {
        assert_eq!(parse_utm_epsg(32633), Some((33, true)));
        assert_eq!(parse_utm_epsg(32721), Some((21, false)));
        assert_eq!(parse_utm_epsg(4326), None);
        assert_eq!(parse_utm_epsg(32600), None);
        assert_eq!(parse_utm_epsg(32661), None);
    }

    #[test]
    fn test_utm_zone_selection() {
        // Malta
        assert_eq!(utm_epsg_for(14.5, 35.9).unwrap(), 32633);
        // Madrid
        assert_eq!(utm_epsg_for(-3.7, 40.4).unwrap(), 32630);
        // Buenos Aires
        assert_eq!(utm_epsg_for(-58.38, -34.6).unwrap(), 32721);
        assert_eq!(utm_epsg_for(180.0, 10.0).unwrap(), 32660);
        assert!(utm_epsg_for(14.5, 85.0).is_err());
        assert!(utm_epsg_for(200.0, 10.0).is_err());
    }

    #[test]
    fn test_equator_central_meridian() {
        let t = CoordTransformer::new(4326, 32630).unwrap();
        let (e, n) = t.transform(-3.0, 0.0).unwrap();
        assert_close(e, 500_000.0, 0.01, "easting at CM");
        assert_close(n, 0.0, 0.01, "northing at equator");
    }

    // pyproj: Transformer.from_crs(4326, 32630, always_xy=True).transform(-3.7037, 40.4168)
    #[test]
    fn test_madrid_to_utm30n() {
        let t = CoordTransformer::new(4326, 32630).unwrap();
        let (e, n) = t.transform(-3.7037, 40.4168).unwrap();
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    #[test]
    fn test_round_trip() {
        let forward = CoordTransformer::new(4326, 32633).unwrap();
        let inverse = CoordTransformer::new(32633, 4326).unwrap();

        let (x, y) = forward.transform(14.45, 35.88).unwrap();
        let (lon, lat) = inverse.transform(x, y).unwrap();
        assert_close(lon, 14.45, 1e-8, "lon");
        assert_close(lat, 35.88, 1e-8, "lat");
    }

    #[test]
    fn test_unsupported_crs() {
        let err = CoordTransformer::new(4326, 3857).unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedCrs { epsg: 3857 }));
    }
}
