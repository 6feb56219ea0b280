//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing. Scalar bounds beyond what
//! clap expresses are validated by `WatchConfig::validate` before any
//! network call.

use clap::{Parser, Subcommand};

use crate::client::FeedType;
use crate::output::{Format, TimeDisplay};

/// Default path for the JSON subscriber store.
pub const DEFAULT_STORE_PATH: &str = "quakewatch-subscribers.json";

/// Real-time earthquake monitoring and alerting from your terminal.
#[derive(Parser, Debug)]
#[command(name = "quakewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor a feed continuously with alerts and a paginated table
    Watch(WatchArgs),

    /// One-shot fetch, filter, and print a page of events
    Tail(TailArgs),

    /// Register a push subscriber (or update its threshold)
    Subscribe(SubscribeArgs),

    /// Remove a push subscriber
    Unsubscribe(UnsubscribeArgs),

    /// List stored push subscribers
    Subscribers(SubscribersArgs),
}

/// Shared filter and location options.
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Feed to fetch
    #[arg(long, default_value = "all_day", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Minimum magnitude to display
    #[arg(long, default_value = "3.0")]
    pub min_magnitude: f64,

    /// Search radius around the observer in km
    #[arg(long, default_value = "500")]
    pub radius: f64,

    /// Observer latitude (manual location; requires --lon)
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Observer longitude (manual location; requires --lat)
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Geocode a place name for the observer location
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub place: Option<String>,

    /// Rows per page
    #[arg(long, default_value = "10")]
    pub page_size: usize,

    /// Time display: local, utc, or a GMT offset like +8
    #[arg(long, default_value = "local", value_parser = parse_time_display)]
    pub time: TimeDisplay,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Alert when a new event's magnitude meets this threshold
    #[arg(long, default_value = "4.5")]
    pub alert_magnitude: f64,

    /// Refresh interval in seconds (15-300)
    #[arg(long, default_value = "60")]
    pub interval: u64,

    /// Ring the terminal bell on alert
    #[arg(long)]
    pub sound: bool,

    /// Send a desktop notification on alert
    #[arg(long)]
    pub desktop: bool,

    /// Push gateway base URL
    #[arg(long, default_value = "https://ntfy.sh")]
    pub push_gateway: String,

    /// Subscriber store path
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Page to print
    #[arg(long, default_value = "1")]
    pub page: usize,
}

/// Arguments for the `subscribe` command.
#[derive(Parser, Debug)]
pub struct SubscribeArgs {
    /// Opaque push-channel token
    #[arg(long)]
    pub token: String,

    /// Minimum magnitude for this subscriber
    #[arg(long, default_value = "6.0")]
    pub threshold: f64,

    /// Subscriber store path
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,
}

/// Arguments for the `unsubscribe` command.
#[derive(Parser, Debug)]
pub struct UnsubscribeArgs {
    /// Opaque push-channel token
    #[arg(long)]
    pub token: String,

    /// Subscriber store path
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,
}

/// Arguments for the `subscribers` command.
#[derive(Parser, Debug)]
pub struct SubscribersArgs {
    /// Subscriber store path
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a time display mode from string.
fn parse_time_display(s: &str) -> Result<TimeDisplay, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::parse_from(["quakewatch", "watch"]);
        let Command::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(args.filter.feed, FeedType::AllDay);
        assert!((args.filter.min_magnitude - 3.0).abs() < f64::EPSILON);
        assert!((args.alert_magnitude - 4.5).abs() < f64::EPSILON);
        assert_eq!(args.interval, 60);
        assert_eq!(args.filter.page_size, 10);
    }

    #[test]
    fn test_manual_location_requires_both_coords() {
        assert!(Cli::try_parse_from(["quakewatch", "watch", "--lat", "14.6"]).is_err());
        assert!(
            Cli::try_parse_from(["quakewatch", "watch", "--lat", "14.6", "--lon", "121.0"])
                .is_ok()
        );
    }

    #[test]
    fn test_place_conflicts_with_manual() {
        assert!(Cli::try_parse_from([
            "quakewatch",
            "watch",
            "--place",
            "Japan",
            "--lat",
            "14.6",
            "--lon",
            "121.0"
        ])
        .is_err());
    }

    #[test]
    fn test_time_display_arg() {
        let cli = Cli::parse_from(["quakewatch", "tail", "--time", "gmt+8"]);
        let Command::Tail(args) = cli.command else {
            panic!("expected tail command");
        };
        assert_eq!(args.filter.time, TimeDisplay::Offset(8));
    }
}
