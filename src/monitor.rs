//! Refresh-cycle orchestration.
//!
//! One cycle runs fetch → normalize → filter → seen-tracker commit →
//! alert dispatch to completion before the next begins; the watch loop
//! is single-threaded, so cycles cannot overlap, and a cooperative stop
//! flag is checked between cycles only. Fetch failures abort the cycle
//! and retain the previously displayed state.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono_tz::Tz;
use tracing::{info, warn};

use crate::alert::{self, LocalAlertBatch, LocalNotifier, PushOutcome, PushSender};
use crate::client::{FeedClient, FeedSource, FeedType};
use crate::errors::QuakeWatchError;
use crate::geo;
use crate::locate::ObserverLocation;
use crate::models::{self, FeatureCollection, QuakeEvent};
use crate::output::TimeDisplay;
use crate::pager::{Page, PageCursor};
use crate::subscribers::SubscriberStore;
use crate::tracker::SeenTracker;

/// Bounds for the refresh interval, seconds.
const MIN_INTERVAL_SECS: u64 = 15;
const MAX_INTERVAL_SECS: u64 = 300;

/// Upper bound for page size; anything larger is a caller bug.
const MAX_PAGE_SIZE: usize = 500;

/// Validated scalar configuration for a watch session.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub feed: FeedType,
    /// Display floor: events below this magnitude are filtered out
    pub min_magnitude: f64,
    /// Alert threshold for the local surface
    pub alert_magnitude: f64,
    pub radius_km: f64,
    pub interval_secs: u64,
    pub page_size: usize,
    pub time_display: TimeDisplay,
    pub notifier: LocalNotifier,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            feed: FeedType::AllDay,
            min_magnitude: 3.0,
            alert_magnitude: 4.5,
            radius_km: 500.0,
            interval_secs: 60,
            page_size: 10,
            time_display: TimeDisplay::Local,
            notifier: LocalNotifier::default(),
        }
    }
}

impl WatchConfig {
    /// Validate all scalars before any network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`QuakeWatchError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), QuakeWatchError> {
        if !self.min_magnitude.is_finite() || !(0.0..=10.0).contains(&self.min_magnitude) {
            return Err(QuakeWatchError::Config {
                field: "min_magnitude",
                message: format!("{} not in [0, 10]", self.min_magnitude),
            });
        }
        if !self.alert_magnitude.is_finite() || !(0.0..=10.0).contains(&self.alert_magnitude) {
            return Err(QuakeWatchError::Config {
                field: "alert_magnitude",
                message: format!("{} not in [0, 10]", self.alert_magnitude),
            });
        }
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(QuakeWatchError::Config {
                field: "radius_km",
                message: format!("{} must be positive", self.radius_km),
            });
        }
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(QuakeWatchError::Config {
                field: "interval_secs",
                message: format!(
                    "{} not in [{MIN_INTERVAL_SECS}, {MAX_INTERVAL_SECS}]",
                    self.interval_secs
                ),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(QuakeWatchError::Config {
                field: "page_size",
                message: format!("{} not in [1, {MAX_PAGE_SIZE}]", self.page_size),
            });
        }
        Ok(())
    }
}

/// Session-scoped state shared across refresh cycles.
///
/// Created at session start; the seen-set resets only by explicit
/// action. The tracker sits behind a mutex so the read-evaluate-write
/// sequence of a cycle is one atomic unit even if a display thread
/// shares the session with a background monitoring thread.
pub struct Session {
    pub observer: ObserverLocation,
    pub local_tz: Tz,
    pub cursor: PageCursor,
    tracker: Mutex<SeenTracker>,
}

impl Session {
    #[must_use]
    pub fn new(observer: ObserverLocation, page_size: usize) -> Self {
        let local_tz = geo::resolve_timezone(observer.latitude, observer.longitude);
        Self {
            observer,
            local_tz,
            cursor: PageCursor::new(page_size),
            tracker: Mutex::new(SeenTracker::with_default_capacity()),
        }
    }

    /// Forget all seen events (explicit user reset).
    pub fn reset_seen(&self) {
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.reset();
        }
    }
}

/// Everything one completed cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    /// In-range events, sorted newest-first
    pub events: Vec<QuakeEvent>,
    /// New-since-last-cycle events meeting the alert threshold
    pub new_candidates: Vec<QuakeEvent>,
    /// Local alert payload, when candidates exist
    pub local_alert: Option<LocalAlertBatch>,
    /// Per-subscriber push results
    pub push_outcomes: Vec<PushOutcome>,
}

/// Process one already-fetched feed through the pipeline.
///
/// Split out from [`run_cycle`] so the classification and alerting
/// logic is testable without a network.
pub fn process_feed(
    feed: &FeatureCollection,
    config: &WatchConfig,
    session: &Session,
    store: &dyn SubscriberStore,
    sender: &dyn PushSender,
) -> CycleReport {
    let mut events: Vec<QuakeEvent> = models::normalize_feed(feed, &session.observer)
        .into_iter()
        .filter(|e| e.in_range(config.min_magnitude, config.radius_km))
        .collect();
    models::sort_newest_first(&mut events);

    // Read, candidate computation, and write-back as one atomic unit.
    let new_candidates = match session.tracker.lock() {
        Ok(mut tracker) => tracker.classify_and_commit(&events, config.alert_magnitude),
        Err(poisoned) => {
            // A panicked holder leaves the set intact; keep going.
            poisoned
                .into_inner()
                .classify_and_commit(&events, config.alert_magnitude)
        }
    };

    let local_alert = alert::build_local_batch(&new_candidates);
    if let Some(batch) = &local_alert {
        info!(
            "{} new earthquake(s) ≥ M{:.1} detected",
            batch.candidate_count, config.alert_magnitude
        );
        config.notifier.announce(batch);
    }

    let push_outcomes = match alert::dispatch_push(&new_candidates, store, sender) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            warn!("push dispatch skipped: {e}");
            Vec::new()
        }
    };

    CycleReport {
        events,
        new_candidates,
        local_alert,
        push_outcomes,
    }
}

/// Run one full cycle: fetch, then process.
///
/// # Errors
///
/// Returns an error when the fetch fails after its fallback attempt;
/// the session state is untouched in that case.
pub fn run_cycle(
    source: &dyn FeedSource,
    config: &WatchConfig,
    session: &Session,
    store: &dyn SubscriberStore,
    sender: &dyn PushSender,
) -> Result<CycleReport, QuakeWatchError> {
    let feed = source.fetch_feed(config.feed)?;
    Ok(process_feed(&feed, config, session, store, sender))
}

/// The cooperative monitoring loop.
pub struct Monitor {
    client: FeedClient,
    config: WatchConfig,
    session: Session,
    store: Box<dyn SubscriberStore>,
    sender: Box<dyn PushSender>,
}

impl Monitor {
    /// Build a monitor with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error before any network call when a scalar
    /// is out of bounds, or an HTTP client initialization error.
    pub fn new(
        config: WatchConfig,
        session: Session,
        store: Box<dyn SubscriberStore>,
        sender: Box<dyn PushSender>,
    ) -> Result<Self, QuakeWatchError> {
        config.validate()?;
        Ok(Self {
            client: FeedClient::new()?,
            config,
            session,
            store,
            sender,
        })
    }

    /// Run cycles until `stop` is set.
    ///
    /// The flag is checked between cycles, never mid-fetch; an
    /// in-flight request completes or times out naturally. Cycles
    /// cannot overlap: the loop itself is the in-flight guard. The
    /// renderer receives each successful cycle's report plus the
    /// session-clamped page; fetch failures are logged and the previous
    /// display state is retained.
    pub fn run(&mut self, stop: &AtomicBool, mut render: impl FnMut(&CycleReport, &Page<'_>)) {
        info!(
            "watching {} within {} km of {} (refresh every {}s)",
            self.config.feed.as_str(),
            self.config.radius_km,
            self.session.observer.label,
            self.config.interval_secs
        );

        while !stop.load(Ordering::Relaxed) {
            match run_cycle(
                &self.client,
                &self.config,
                &self.session,
                self.store.as_ref(),
                self.sender.as_ref(),
            ) {
                Ok(report) => {
                    let page = self.session.cursor.current(&report.events);
                    render(&report, &page);
                }
                Err(e) => {
                    warn!("cycle aborted, previous results retained: {e}");
                }
            }

            // Sleep in one-second slices so a stop request does not
            // wait out the whole interval.
            for _ in 0..self.config.interval_secs {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }

        info!("monitor stopped");
    }
}
