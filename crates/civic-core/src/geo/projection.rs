//! Spherical Web Mercator math used by the headless surface and the popup
//! recentering logic.

use super::types::{LatLng, Point};

pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a coordinate to world pixel space at `zoom`.
pub fn project(latlng: LatLng, zoom: f64) -> Point {
    let size = world_size(zoom);
    let lat = latlng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (latlng.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    Point::new(x, y)
}

/// Inverse of [`project`].
pub fn unproject(point: Point, zoom: f64) -> LatLng {
    let size = world_size(zoom);
    let lng = point.x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * point.y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_to_world_center() {
        let p = project(LatLng::new(0.0, 0.0), 0.0);
        assert!((p.x - 128.0).abs() < 1e-9);
        assert!((p.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_unproject_inverse() {
        let original = LatLng::new(42.3876, -71.0995);
        for zoom in [3.0, 13.0, 17.0] {
            let back = unproject(project(original, zoom), zoom);
            assert!((back.lat - original.lat).abs() < 1e-9);
            assert!((back.lng - original.lng).abs() < 1e-9);
        }
    }

    #[test]
    fn test_y_grows_southward() {
        let north = project(LatLng::new(43.0, -71.0), 10.0);
        let south = project(LatLng::new(42.0, -71.0), 10.0);
        assert!(south.y > north.y);
    }
}
