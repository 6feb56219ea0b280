//! Data models for USGS earthquake feeds and the normalized event.
//!
//! The feed structures match the GeoJSON summary format from USGS,
//! slimmed to the fields the monitoring core consumes. `QuakeEvent` is
//! the normalized, immutable per-cycle event the rest of the pipeline
//! operates on.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::QuakeWatchError;
use crate::geo;
use crate::locate::ObserverLocation;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Earthquake events
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), QuakeWatchError> {
        if self.type_ != "FeatureCollection" {
            return Err(QuakeWatchError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }
}

/// A single earthquake record as delivered by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Primary event ID (may be absent in malformed records)
    #[serde(default)]
    pub id: Option<String>,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

impl Feature {
    /// Extract the event identifier, falling back through alternate
    /// fields when the primary is absent: `id`, then `code`, then the
    /// first entry of the comma-separated `ids` list.
    #[must_use]
    pub fn event_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            if !id.is_empty() {
                return Some(id.clone());
            }
        }
        if let Some(code) = &self.properties.code {
            if !code.is_empty() {
                return Some(code.clone());
            }
        }
        self.properties
            .ids
            .as_deref()
            .and_then(|ids| ids.split(',').find(|s| !s.is_empty()))
            .map(ToString::to_string)
    }

    /// Get longitude (degrees). Feed order is `[lon, lat, depth]`.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.geometry.coordinates.first().copied().unwrap_or(0.0)
    }

    /// Get latitude (degrees).
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.geometry.coordinates.get(1).copied().unwrap_or(0.0)
    }
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    pub coordinates: Vec<f64>,
}

/// Event properties from the USGS feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Magnitude value (null for some automatic solutions)
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,

    /// Event code (identifier fallback)
    #[serde(default)]
    pub code: Option<String>,

    /// Comma-separated event IDs (identifier fallback)
    #[serde(default)]
    pub ids: Option<String>,
}

/// A normalized earthquake event.
///
/// Created fresh on every fetch cycle and never mutated afterwards.
/// Filtering and sorting operate on `time_utc`; any display-time
/// conversion happens at the output layer only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuakeEvent {
    pub id: String,
    pub time_utc: DateTime<Utc>,
    pub magnitude: f64,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the observer, kilometers
    pub distance_km: f64,
}

impl QuakeEvent {
    /// Normalize a raw feed record against the observer location.
    ///
    /// Returns `None` for records with no usable identifier or an
    /// unrepresentable timestamp; a bad record must not abort the batch.
    #[must_use]
    pub fn from_feature(feature: &Feature, observer: &ObserverLocation) -> Option<Self> {
        let id = feature.event_id()?;
        let time_utc = Utc.timestamp_millis_opt(feature.properties.time).single()?;

        let latitude = feature.latitude();
        let longitude = feature.longitude();
        let distance_km =
            geo::haversine_km(observer.latitude, observer.longitude, latitude, longitude);

        Some(Self {
            id,
            time_utc,
            magnitude: feature.properties.mag.unwrap_or(0.0),
            place: feature
                .properties
                .place
                .clone()
                .unwrap_or_else(|| "Unknown location".to_string()),
            latitude,
            longitude,
            distance_km,
        })
    }

    /// Check the in-range predicate for the current session window.
    #[must_use]
    pub fn in_range(&self, min_magnitude: f64, radius_km: f64) -> bool {
        self.magnitude >= min_magnitude && self.distance_km <= radius_km
    }
}

/// Normalize a full feed, dropping unusable records with a warning.
#[must_use]
pub fn normalize_feed(feed: &FeatureCollection, observer: &ObserverLocation) -> Vec<QuakeEvent> {
    feed.features
        .iter()
        .filter_map(|f| {
            let event = QuakeEvent::from_feature(f, observer);
            if event.is_none() {
                tracing::warn!("skipping feed record with no usable id or timestamp");
            }
            event
        })
        .collect()
}

/// Sort events descending by UTC instant.
///
/// The sort is stable: records sharing an instant keep feed order.
pub fn sort_newest_first(events: &mut [QuakeEvent]) {
    events.sort_by(|a, b| b.time_utc.cmp(&a.time_utc));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observer() -> ObserverLocation {
        ObserverLocation {
            latitude: 14.5995,
            longitude: 120.9842,
            label: "Manila".to_string(),
        }
    }

    #[test]
    fn test_parse_sample_feed() {
        let json = include_str!("../tools/sample_feed.json");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample feed");

        feed.validate().expect("invalid feed");
        assert_eq!(feed.type_, "FeatureCollection");
        assert!(!feed.features.is_empty());
    }

    #[test]
    fn test_id_fallback_order() {
        let json = include_str!("../tools/sample_feed.json");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample feed");

        // Third fixture record has no top-level id, only a code.
        let no_id = &feed.features[2];
        assert!(no_id.id.is_none());
        assert_eq!(no_id.event_id().as_deref(), Some("73999999"));
    }

    #[test]
    fn test_normalize_defaults() {
        let json = include_str!("../tools/sample_feed.json");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample feed");

        let events = normalize_feed(&feed, &observer());
        assert_eq!(events.len(), feed.features.len());

        // Second fixture record has null mag and place.
        let defaulted = events
            .iter()
            .find(|e| e.id == "us7000nulls")
            .expect("missing fixture event");
        assert!((defaulted.magnitude - 0.0).abs() < f64::EPSILON);
        assert_eq!(defaulted.place, "Unknown location");
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let base = Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap();
        let mk = |id: &str, offset_ms: i64| QuakeEvent {
            id: id.to_string(),
            time_utc: base + chrono::Duration::milliseconds(offset_ms),
            magnitude: 1.0,
            place: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            distance_km: 0.0,
        };

        let mut events = vec![mk("a", 0), mk("b", 1000), mk("c", 0), mk("d", 2000)];
        sort_newest_first(&mut events);

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        // Ties (a, c) keep their feed order.
        assert_eq!(ids, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn test_in_range_predicate() {
        let event = QuakeEvent {
            id: "x".to_string(),
            time_utc: Utc::now(),
            magnitude: 4.5,
            place: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            distance_km: 300.0,
        };

        assert!(event.in_range(3.0, 500.0));
        assert!(!event.in_range(5.0, 500.0)); // magnitude below floor
        assert!(!event.in_range(3.0, 200.0)); // outside radius
    }
}
