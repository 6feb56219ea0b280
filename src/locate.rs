//! Observer location resolution.
//!
//! The observer position is resolved once per session from one of three
//! sources: IP geolocation, free-text place geocoding, or manual entry.
//! Both network paths are treated as unreliable and always degrade to a
//! hardcoded fallback coordinate; a geolocation failure is never fatal.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::QuakeWatchError;

/// Timeout for geolocation lookups (shorter than feed fetches; these
/// services are best-effort).
const GEO_TIMEOUT_SECS: u64 = 5;

const USER_AGENT: &str = concat!("quakewatch/", env!("CARGO_PKG_VERSION"));

const IP_LOOKUP_URL: &str = "https://ipinfo.io/json";
const GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Fallback coordinate used whenever resolution fails.
const FALLBACK: (f64, f64, &str) = (14.5995, 120.9842, "Manila (fallback)");

/// Session-scoped observer position.
#[derive(Debug, Clone)]
pub struct ObserverLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl ObserverLocation {
    /// The hardcoded fallback position.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            latitude: FALLBACK.0,
            longitude: FALLBACK.1,
            label: FALLBACK.2.to_string(),
        }
    }

    /// Manual entry.
    #[must_use]
    pub fn manual(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            label: format!("Custom: {latitude:.2}, {longitude:.2}"),
        }
    }
}

/// How the observer position should be resolved.
#[derive(Debug, Clone)]
pub enum LocationMode {
    /// Best-effort IP geolocation
    AutoIp,
    /// Geocode a free-text place name
    Place(String),
    /// Explicit coordinates
    Manual { latitude: f64, longitude: f64 },
}

/// Resolve the observer location for this session.
///
/// Never fails: all resolution errors degrade to the fallback position
/// with a warning.
#[must_use]
pub fn resolve(mode: &LocationMode) -> ObserverLocation {
    match mode {
        LocationMode::Manual {
            latitude,
            longitude,
        } => ObserverLocation::manual(*latitude, *longitude),
        LocationMode::AutoIp => locate_by_ip().unwrap_or_else(|e| {
            warn!("IP geolocation failed ({e}), using fallback location");
            ObserverLocation::fallback()
        }),
        LocationMode::Place(name) => geocode_place(name).unwrap_or_else(|e| {
            warn!("geocoding '{name}' failed ({e}), using fallback location");
            ObserverLocation::fallback()
        }),
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    /// "lat,lon" pair
    loc: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

fn geo_client() -> Result<Client, QuakeWatchError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(GEO_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

fn locate_by_ip() -> Result<ObserverLocation, QuakeWatchError> {
    let client = geo_client()?;
    let info: IpInfoResponse = client.get(IP_LOOKUP_URL).send()?.json()?;

    let loc = info
        .loc
        .ok_or_else(|| QuakeWatchError::Geolocation("response missing 'loc' field".into()))?;

    let (lat, lon) = parse_loc_pair(&loc)?;

    let label = [info.city, info.country]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let label = if label.is_empty() {
        "IP location".to_string()
    } else {
        label
    };

    debug!("IP geolocation resolved to {lat:.4}, {lon:.4} ({label})");

    Ok(ObserverLocation {
        latitude: lat,
        longitude: lon,
        label,
    })
}

/// Parse an ipinfo-style "lat,lon" pair.
fn parse_loc_pair(loc: &str) -> Result<(f64, f64), QuakeWatchError> {
    let mut parts = loc.splitn(2, ',');
    let lat = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| QuakeWatchError::Geolocation(format!("bad loc pair: {loc}")))?;
    let lon = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| QuakeWatchError::Geolocation(format!("bad loc pair: {loc}")))?;
    Ok((lat, lon))
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

fn geocode_place(name: &str) -> Result<ObserverLocation, QuakeWatchError> {
    let client = geo_client()?;
    let hits: Vec<GeocodeHit> = client
        .get(GEOCODE_URL)
        .query(&[("q", name), ("format", "json"), ("limit", "1")])
        .send()?
        .json()?;

    let hit = hits
        .into_iter()
        .next()
        .ok_or_else(|| QuakeWatchError::Geolocation(format!("no geocode result for '{name}'")))?;

    let latitude = hit
        .lat
        .parse::<f64>()
        .map_err(|e| QuakeWatchError::Geolocation(format!("bad latitude '{}': {e}", hit.lat)))?;
    let longitude = hit
        .lon
        .parse::<f64>()
        .map_err(|e| QuakeWatchError::Geolocation(format!("bad longitude '{}': {e}", hit.lon)))?;

    Ok(ObserverLocation {
        latitude,
        longitude,
        label: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loc_pair() {
        let (lat, lon) = parse_loc_pair("14.5995,120.9842").unwrap();
        assert!((lat - 14.5995).abs() < 1e-9);
        assert!((lon - 120.9842).abs() < 1e-9);
    }

    #[test]
    fn test_parse_loc_pair_rejects_garbage() {
        assert!(parse_loc_pair("not-a-pair").is_err());
        assert!(parse_loc_pair("12.0").is_err());
        assert!(parse_loc_pair("12.0,abc").is_err());
    }

    #[test]
    fn test_manual_label() {
        let loc = ObserverLocation::manual(14.5995, 120.9842);
        assert_eq!(loc.label, "Custom: 14.60, 120.98");
    }

    #[test]
    fn test_fallback_is_manila() {
        let loc = ObserverLocation::fallback();
        assert!((loc.latitude - 14.5995).abs() < 1e-9);
        assert!((loc.longitude - 120.9842).abs() < 1e-9);
    }
}
