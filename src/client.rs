//! USGS earthquake feed client.
//!
//! Blocking HTTP access to the summary GeoJSON feeds, with a single
//! fallback attempt through a freshly built client when the primary
//! request fails for any reason (network, TLS, decode).

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument, warn};

use crate::errors::QuakeWatchError;
use crate::models::FeatureCollection;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakewatch/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Available summary feeds (the set the dashboard exposes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    AllHour,
    AllDay,
    Mag1Week,
    Mag25Week,
    Mag45Week,
}

impl FeedType {
    /// Get the URL path segment for this feed type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllHour => "all_hour",
            Self::AllDay => "all_day",
            Self::Mag1Week => "1.0_week",
            Self::Mag25Week => "2.5_week",
            Self::Mag45Week => "4.5_week",
        }
    }

    /// Human-readable title for table headers.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::AllHour => "Past Hour (all)",
            Self::AllDay => "Past Day (all)",
            Self::Mag1Week => "Past 7 Days (M1.0+)",
            Self::Mag25Week => "Past 7 Days (M2.5+)",
            Self::Mag45Week => "Past 7 Days (M4.5+)",
        }
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_hour" => Ok(Self::AllHour),
            "all_day" => Ok(Self::AllDay),
            "1.0_week" => Ok(Self::Mag1Week),
            "2.5_week" => Ok(Self::Mag25Week),
            "4.5_week" => Ok(Self::Mag45Week),
            _ => Err(format!(
                "unknown feed type: {s} (expected: all_hour, all_day, 1.0_week, 2.5_week, 4.5_week)"
            )),
        }
    }
}

/// Source of summary feeds.
///
/// The cycle orchestration in [`crate::monitor`] fetches through this
/// trait so failure paths can be exercised without a network.
pub trait FeedSource: Send + Sync {
    /// Fetch a summary feed.
    ///
    /// # Errors
    ///
    /// Returns an error when the feed cannot be retrieved or decoded.
    fn fetch_feed(&self, feed_type: FeedType) -> Result<FeatureCollection, QuakeWatchError>;
}

impl FeedSource for FeedClient {
    fn fetch_feed(&self, feed_type: FeedType) -> Result<FeatureCollection, QuakeWatchError> {
        FeedClient::fetch_feed(self, feed_type)
    }
}

/// Client for USGS earthquake feeds.
pub struct FeedClient {
    client: Client,
    base_url: String,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, QuakeWatchError> {
        Ok(Self {
            client: build_client()?,
            base_url: USGS_BASE_URL.to_string(),
        })
    }

    /// Fetch a summary GeoJSON feed.
    ///
    /// The primary attempt goes through the long-lived pooled client; on
    /// any failure exactly one fallback attempt is made through a fresh
    /// client with the same header and timeout. No further retries, no
    /// backoff, no cached result.
    ///
    /// # Errors
    ///
    /// Returns [`QuakeWatchError::Fetch`] when both attempts fail.
    #[instrument(skip(self), fields(feed = feed_type.as_str()))]
    pub fn fetch_feed(&self, feed_type: FeedType) -> Result<FeatureCollection, QuakeWatchError> {
        let url = format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            self.base_url,
            feed_type.as_str()
        );

        debug!("fetching feed from {}", url);

        let primary_err = match fetch_once(&self.client, &url) {
            Ok(feed) => return Ok(feed),
            Err(e) => e,
        };

        warn!("primary fetch failed ({primary_err}), retrying with fresh client");

        let fallback = build_client()
            .map_err(|e| QuakeWatchError::Fetch(format!("primary: {primary_err}; fallback client: {e}")))?;

        fetch_once(&fallback, &url).map_err(|fallback_err| {
            QuakeWatchError::Fetch(format!(
                "primary: {primary_err}; fallback: {fallback_err}"
            ))
        })
    }
}

fn build_client() -> Result<Client, QuakeWatchError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// One GET + decode + validate attempt against a given client.
fn fetch_once(client: &Client, url: &str) -> Result<FeatureCollection, QuakeWatchError> {
    let response = client.get(url).send()?;

    // Check status before parsing
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(QuakeWatchError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = response.text()?;
    let feed: FeatureCollection = serde_json::from_str(&body)?;
    feed.validate()?;

    debug!("fetched {} events", feed.features.len());
    Ok(feed)
}
