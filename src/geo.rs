//! Geodesic utilities: great-circle distance and coordinate→timezone lookup.

use std::sync::OnceLock;

use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

/// Earth mean radius in kilometers (IUGG value).
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Calculate the great-circle distance between two points using the
/// haversine formula.
///
/// Returns distance in kilometers. Symmetric in its arguments and zero
/// for identical points.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn finder() -> &'static DefaultFinder {
    static FINDER: OnceLock<DefaultFinder> = OnceLock::new();
    FINDER.get_or_init(DefaultFinder::new)
}

/// Resolve the IANA timezone containing a coordinate.
///
/// Falls back to UTC when no zone is found or the name does not parse.
#[must_use]
pub fn resolve_timezone(lat: f64, lon: f64) -> Tz {
    let name = finder().get_tz_name(lon, lat);
    if name.is_empty() {
        return chrono_tz::UTC;
    }
    name.parse().unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_symmetric() {
        let d1 = haversine_km(37.77, -122.41, 34.05, -118.24);
        let d2 = haversine_km(34.05, -118.24, 37.77, -122.41);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_identity() {
        assert!(haversine_km(14.5995, 120.9842, 14.5995, 120.9842).abs() < 1e-12);
    }

    #[test]
    fn test_haversine_known_distance() {
        // SF to LA is roughly 560 km
        let distance = haversine_km(37.77, -122.41, 34.05, -118.24);
        assert!(distance > 500.0 && distance < 620.0);
    }

    #[test]
    fn test_haversine_triangle_inequality() {
        // SF, Denver, New York
        let sf = (37.77, -122.41);
        let den = (39.74, -104.99);
        let ny = (40.71, -74.01);

        let direct = haversine_km(sf.0, sf.1, ny.0, ny.1);
        let via = haversine_km(sf.0, sf.1, den.0, den.1) + haversine_km(den.0, den.1, ny.0, ny.1);
        assert!(direct <= via + 1e-9);
    }

    #[test]
    fn test_resolve_timezone_manila() {
        assert_eq!(resolve_timezone(14.5995, 120.9842), chrono_tz::Asia::Manila);
    }

    #[test]
    fn test_resolve_timezone_open_ocean_falls_back() {
        // Middle of the South Pacific; tzf maps open ocean to Etc zones
        // or nothing, either way the result must be a usable zone.
        let tz = resolve_timezone(-40.0, -120.0);
        assert!(!tz.name().is_empty());
    }
}
