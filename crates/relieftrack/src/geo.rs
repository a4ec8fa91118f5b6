//! Geographic primitives: coordinates, bounds, and Web-Mercator math.
//!
//! The viewport fit logic mirrors what a slippy-map client does: project the
//! bounds into pixel space, then pick the largest integer zoom at which the
//! padded bounds still fit the viewport.

use serde::{Deserialize, Serialize};

/// Pixel size of one map tile.
const TILE_SIZE: f64 = 256.0;

/// Latitude beyond which the Web-Mercator projection degenerates.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLng {
    /// Create a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that both components are finite numbers.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// An axis-aligned bounding box over geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    /// Southern latitude edge.
    pub south: f64,
    /// Western longitude edge.
    pub west: f64,
    /// Northern latitude edge.
    pub north: f64,
    /// Eastern longitude edge.
    pub east: f64,
}

impl LatLngBounds {
    /// Compute the bounds of a point set, or `None` when it is empty.
    #[must_use]
    pub fn of(points: &[LatLng]) -> Option<Self> {
        let mut iter = points.iter();
        let first = iter.next()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for point in iter {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    /// Grow the bounds to include `point`.
    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.west = self.west.min(point.lon);
        self.north = self.north.max(point.lat);
        self.east = self.east.max(point.lon);
    }

    /// Check whether `point` lies within the bounds (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lon >= self.west
            && point.lon <= self.east
    }

    /// The center of the bounds.
    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// The largest integer zoom at which these bounds, inset by `padding`
    /// pixels on every side, fit a `width` x `height` pixel viewport.
    ///
    /// A degenerate (single-point) bounds fits at `max_zoom`.
    #[must_use]
    pub fn fit_zoom(&self, width: u32, height: u32, padding: u32, max_zoom: f64) -> f64 {
        let avail_w = f64::from(width.saturating_sub(padding * 2)).max(1.0);
        let avail_h = f64::from(height.saturating_sub(padding * 2)).max(1.0);

        // Pixel extents of the bounds at zoom 0.
        let (x_min, y_max) = project(LatLng::new(self.south, self.west), 0.0);
        let (x_max, y_min) = project(LatLng::new(self.north, self.east), 0.0);
        let dx = (x_max - x_min).abs();
        let dy = (y_max - y_min).abs();

        if dx < f64::EPSILON && dy < f64::EPSILON {
            return max_zoom;
        }

        let scale_x = if dx < f64::EPSILON {
            f64::INFINITY
        } else {
            avail_w / dx
        };
        let scale_y = if dy < f64::EPSILON {
            f64::INFINITY
        } else {
            avail_h / dy
        };

        let zoom = scale_x.min(scale_y).log2().floor();
        zoom.clamp(0.0, max_zoom)
    }
}

/// Project a coordinate to pixel space at the given zoom level.
///
/// Returns `(x, y)` with the origin at the north-west corner of the world.
#[must_use]
pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let world = TILE_SIZE * 2f64.powf(zoom);
    let x = (point.lon + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * world;
    (x, y)
}

/// Inverse of [`project`]: pixel space back to a coordinate.
#[must_use]
pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
    let world = TILE_SIZE * 2f64.powf(zoom);
    let lon = x / world * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / world);
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_is_valid() {
        assert!(LatLng::new(19.4326, -99.1332).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_bounds_of_empty() {
        assert!(LatLngBounds::of(&[]).is_none());
    }

    #[test]
    fn test_bounds_of_points() {
        let points = vec![
            LatLng::new(19.40, -99.20),
            LatLng::new(19.50, -99.10),
            LatLng::new(19.45, -99.15),
        ];
        let bounds = LatLngBounds::of(&points).unwrap();

        assert!((bounds.south - 19.40).abs() < f64::EPSILON);
        assert!((bounds.north - 19.50).abs() < f64::EPSILON);
        assert!((bounds.west + 99.20).abs() < f64::EPSILON);
        assert!((bounds.east + 99.10).abs() < f64::EPSILON);

        for point in points {
            assert!(bounds.contains(point));
        }
    }

    #[test]
    fn test_bounds_contains_edges() {
        let bounds = LatLngBounds::of(&[LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]).unwrap();
        assert!(bounds.contains(LatLng::new(0.0, 0.0)));
        assert!(bounds.contains(LatLng::new(1.0, 1.0)));
        assert!(bounds.contains(LatLng::new(0.5, 0.5)));
        assert!(!bounds.contains(LatLng::new(1.1, 0.5)));
    }

    #[test]
    fn test_bounds_center() {
        let bounds = LatLngBounds::of(&[LatLng::new(10.0, 20.0), LatLng::new(20.0, 40.0)]).unwrap();
        let center = bounds.center();
        assert!((center.lat - 15.0).abs() < f64::EPSILON);
        assert!((center.lon - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_project_unproject_round_trip() {
        let point = LatLng::new(19.4326, -99.1332);
        let (x, y) = project(point, 13.0);
        let back = unproject(x, y, 13.0);
        assert!((back.lat - point.lat).abs() < 1e-9);
        assert!((back.lon - point.lon).abs() < 1e-9);
    }

    #[test]
    fn test_project_world_corners() {
        let (x, _) = project(LatLng::new(0.0, -180.0), 0.0);
        assert!(x.abs() < 1e-9);
        let (x, _) = project(LatLng::new(0.0, 180.0), 0.0);
        assert!((x - 256.0).abs() < 1e-9);
        let (_, y) = project(LatLng::new(0.0, 0.0), 0.0);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_zoom_single_point_hits_max() {
        let bounds = LatLngBounds::of(&[LatLng::new(19.43, -99.13)]).unwrap();
        let zoom = bounds.fit_zoom(1024, 768, 20, 19.0);
        assert!((zoom - 19.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_zoom_contains_bounds() {
        // After fitting, the whole bounds must sit inside the padded viewport.
        let bounds = LatLngBounds::of(&[
            LatLng::new(19.40, -99.20),
            LatLng::new(19.50, -99.10),
        ])
        .unwrap();
        let zoom = bounds.fit_zoom(1024, 768, 20, 19.0);
        assert!(zoom > 0.0);

        let (x_min, y_max) = project(LatLng::new(bounds.south, bounds.west), zoom);
        let (x_max, y_min) = project(LatLng::new(bounds.north, bounds.east), zoom);
        assert!((x_max - x_min).abs() <= f64::from(1024 - 2 * 20));
        assert!((y_max - y_min).abs() <= f64::from(768 - 2 * 20));
    }

    #[test]
    fn test_fit_zoom_wide_bounds_zooms_out() {
        let world = LatLngBounds::of(&[
            LatLng::new(-60.0, -170.0),
            LatLng::new(70.0, 170.0),
        ])
        .unwrap();
        let zoom = world.fit_zoom(1024, 768, 20, 19.0);
        assert!(zoom <= 2.0);
    }

    #[test]
    fn test_fit_zoom_smaller_viewport_fits_lower() {
        let bounds = LatLngBounds::of(&[
            LatLng::new(19.40, -99.20),
            LatLng::new(19.50, -99.10),
        ])
        .unwrap();
        let large = bounds.fit_zoom(2048, 1536, 20, 19.0);
        let small = bounds.fit_zoom(512, 384, 20, 19.0);
        assert!(small <= large);
    }
}
