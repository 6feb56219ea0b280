//! Alert dispatch for newly observed events.
//!
//! Two surfaces share one policy: both the local cue and the push
//! channel evaluate the cycle's new-since-last-cycle candidates. The
//! local surface fires once per cycle against the session's global
//! threshold; the push surface fires once per stored subscriber whose
//! individual threshold is met. Channel failures are isolated: one bad
//! recipient never aborts the batch, and a failed local cue is
//! best-effort.

use std::process::Command;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::errors::QuakeWatchError;
use crate::models::QuakeEvent;
use crate::subscribers::SubscriberStore;

/// How many candidates the local summary carries.
const LOCAL_SUMMARY_LIMIT: usize = 3;

/// Timeout for push gateway calls.
const PUSH_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("quakewatch/", env!("CARGO_PKG_VERSION"));

/// One cycle's local alert payload.
#[derive(Debug, Clone)]
pub struct LocalAlertBatch {
    /// Total new candidates this cycle
    pub candidate_count: usize,
    /// Up to three most recent candidates for the summary lines
    pub summary: Vec<QuakeEvent>,
    /// The single most recent candidate, for the richer notification
    pub most_recent: QuakeEvent,
}

/// Build the local alert batch from the cycle's candidates.
///
/// `candidates` must already be sorted newest-first; returns `None`
/// when the cycle produced no candidates.
#[must_use]
pub fn build_local_batch(candidates: &[QuakeEvent]) -> Option<LocalAlertBatch> {
    let most_recent = candidates.first()?.clone();
    Some(LocalAlertBatch {
        candidate_count: candidates.len(),
        summary: candidates.iter().take(LOCAL_SUMMARY_LIMIT).cloned().collect(),
        most_recent,
    })
}

/// Session toggles for the local alert surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalNotifier {
    pub sound: bool,
    pub desktop: bool,
}

impl LocalNotifier {
    /// Fire the local cues for a batch. Best-effort: failures to ring
    /// the bell or reach the desktop notifier are swallowed.
    pub fn announce(&self, batch: &LocalAlertBatch) {
        if self.sound {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "\x07");
            let _ = stdout.flush();
        }

        if self.desktop {
            let e = &batch.most_recent;
            let title = "New earthquake detected";
            let body = format!(
                "M{:.1} — {} — {}",
                e.magnitude,
                e.place,
                e.time_utc.format("%Y-%m-%d %H:%M:%S UTC")
            );
            // Silently ignored if notify-send is not installed or DISPLAY is unset.
            let _ = Command::new("notify-send")
                .args(["--app-name", "quakewatch", title, &body])
                .spawn();
        }
    }
}

/// Result of one push dispatch attempt.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub token: String,
    pub result: Result<(), String>,
}

/// Push message sender.
pub trait PushSender {
    /// Deliver one message to one channel token.
    ///
    /// # Errors
    ///
    /// Returns [`QuakeWatchError::Dispatch`] when delivery fails; the
    /// caller reports it per recipient and carries on.
    fn send(&self, token: &str, message: &str) -> Result<(), QuakeWatchError>;
}

/// ntfy-style HTTP gateway sender: POST body to `<base>/<token>`.
pub struct HttpPushSender {
    client: Client,
    base_url: String,
}

impl HttpPushSender {
    /// Create a sender against a gateway base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>) -> Result<Self, QuakeWatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PUSH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl PushSender for HttpPushSender {
    fn send(&self, token: &str, message: &str) -> Result<(), QuakeWatchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), token);
        let response = self
            .client
            .post(&url)
            .body(message.to_string())
            .send()
            .map_err(|e| QuakeWatchError::Dispatch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuakeWatchError::Dispatch(format!(
                "gateway returned HTTP {status}"
            )));
        }
        Ok(())
    }
}

/// Format the push payload for an event.
#[must_use]
pub fn push_message(event: &QuakeEvent) -> String {
    format!(
        "M{:.1} earthquake — {} — {}",
        event.magnitude,
        event.place,
        event.time_utc.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Dispatch push alerts for the cycle's candidates.
///
/// For every stored subscriber, the most recent candidate meeting that
/// subscriber's threshold (if any) is delivered as one message. Each
/// dispatch is independent; outcomes are collected, never raised.
///
/// `candidates` must already be sorted newest-first.
///
/// # Errors
///
/// Returns an error only when the subscriber store itself cannot be
/// read; individual delivery failures land in the outcomes.
pub fn dispatch_push(
    candidates: &[QuakeEvent],
    store: &dyn SubscriberStore,
    sender: &dyn PushSender,
) -> Result<Vec<PushOutcome>, QuakeWatchError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut outcomes = Vec::new();
    for (token, threshold) in store.list()? {
        let Some(event) = candidates.iter().find(|e| e.magnitude >= threshold) else {
            debug!("no candidate meets threshold {threshold} for {token}");
            continue;
        };

        let result = match sender.send(&token, &push_message(event)) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("push to {token} failed: {e}");
                Err(e.to_string())
            }
        };
        outcomes.push(PushOutcome { token, result });
    }

    Ok(outcomes)
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::{PushSender, QuakeWatchError};

    /// Records deliveries; fails for configured tokens.
    #[derive(Debug, Default)]
    pub struct RecordingSender {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail_tokens: HashSet<String>,
    }

    impl RecordingSender {
        pub fn failing(tokens: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_tokens: tokens.iter().map(ToString::to_string).collect(),
            }
        }

        pub fn sent_tokens(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(t, _)| t.clone())
                .collect()
        }
    }

    impl PushSender for RecordingSender {
        fn send(&self, token: &str, message: &str) -> Result<(), QuakeWatchError> {
            if self.fail_tokens.contains(token) {
                return Err(QuakeWatchError::Dispatch("simulated failure".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((token.to_string(), message.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSender;
    use super::*;
    use crate::subscribers::{MemoryStore, SubscriberStore as _};
    use chrono::{TimeZone, Utc};

    fn candidate(id: &str, magnitude: f64, minutes_ago: i64) -> QuakeEvent {
        QuakeEvent {
            id: id.to_string(),
            time_utc: Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap()
                - chrono::Duration::minutes(minutes_ago),
            magnitude,
            place: format!("near {id}"),
            latitude: 0.0,
            longitude: 0.0,
            distance_km: 50.0,
        }
    }

    #[test]
    fn test_local_batch_top_three_by_recency() {
        let candidates = vec![
            candidate("q1", 5.0, 0),
            candidate("q2", 6.5, 1),
            candidate("q3", 5.5, 2),
            candidate("q4", 7.0, 3),
        ];

        let batch = build_local_batch(&candidates).expect("batch expected");
        assert_eq!(batch.candidate_count, 4);
        assert_eq!(batch.most_recent.id, "q1");

        let ids: Vec<&str> = batch.summary.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_local_batch_empty() {
        assert!(build_local_batch(&[]).is_none());
    }

    #[test]
    fn test_push_respects_per_subscriber_threshold() {
        let store = MemoryStore::new();
        store.upsert("low", 5.0).unwrap();
        store.upsert("high", 7.0).unwrap();

        let sender = RecordingSender::default();
        let candidates = vec![candidate("q1", 6.0, 0)];

        let outcomes = dispatch_push(&candidates, &store, &sender).unwrap();

        // Only the 5.0-threshold subscriber gets a dispatch attempt.
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].token, "low");
        assert!(outcomes[0].result.is_ok());
        assert_eq!(sender.sent_tokens(), vec!["low".to_string()]);
    }

    #[test]
    fn test_push_failure_is_isolated() {
        let store = MemoryStore::new();
        store.upsert("ok-1", 4.0).unwrap();
        store.upsert("bad", 4.0).unwrap();
        store.upsert("ok-2", 4.0).unwrap();

        let sender = RecordingSender::failing(&["bad"]);
        let candidates = vec![candidate("q1", 6.0, 0)];

        let outcomes = dispatch_push(&candidates, &store, &sender).unwrap();
        assert_eq!(outcomes.len(), 3);

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.token.as_str())
            .collect();
        assert_eq!(failed, vec!["bad"]);

        // Both healthy subscribers were still delivered to.
        let mut sent = sender.sent_tokens();
        sent.sort();
        assert_eq!(sent, vec!["ok-1".to_string(), "ok-2".to_string()]);
    }

    #[test]
    fn test_push_no_candidates_no_work() {
        let store = MemoryStore::new();
        store.upsert("tok", 1.0).unwrap();

        let sender = RecordingSender::default();
        let outcomes = dispatch_push(&[], &store, &sender).unwrap();
        assert!(outcomes.is_empty());
        assert!(sender.sent_tokens().is_empty());
    }

    #[test]
    fn test_push_message_contents() {
        let msg = push_message(&candidate("q1", 6.12, 0));
        assert!(msg.contains("M6.1"));
        assert!(msg.contains("near q1"));
        assert!(msg.contains("UTC"));
    }
}
