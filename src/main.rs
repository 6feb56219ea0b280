//! QuakeWatch - Real-time earthquake monitoring and alerting.
//!
//! Fetches USGS summary feeds, filters events against a spatial and
//! magnitude window around the observer, alerts on new events across
//! refresh cycles, and prints a paginated, timezone-aware table.

use std::io;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod alert;
mod cli;
mod client;
mod errors;
mod geo;
mod locate;
mod models;
mod monitor;
mod output;
mod pager;
mod subscribers;
mod tracker;

use cli::{Cli, Command, FilterArgs};
use client::FeedClient;
use locate::{LocationMode, ObserverLocation};
use monitor::{Monitor, Session, WatchConfig};
use subscribers::{JsonFileStore, SubscriberStore};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Watch(args) => cmd_watch(args),
        Command::Tail(args) => cmd_tail(args),
        Command::Subscribe(args) => cmd_subscribe(args),
        Command::Unsubscribe(args) => cmd_unsubscribe(args),
        Command::Subscribers(args) => cmd_subscribers(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Resolve the session's observer location from the shared filter args.
fn resolve_observer(filter: &FilterArgs) -> ObserverLocation {
    let mode = match (&filter.place, filter.lat, filter.lon) {
        (Some(place), _, _) => LocationMode::Place(place.clone()),
        (None, Some(latitude), Some(longitude)) => LocationMode::Manual {
            latitude,
            longitude,
        },
        _ => LocationMode::AutoIp,
    };
    locate::resolve(&mode)
}

/// Execute the `watch` command - the continuous monitoring loop.
fn cmd_watch(args: cli::WatchArgs) -> Result<()> {
    let config = WatchConfig {
        feed: args.filter.feed,
        min_magnitude: args.filter.min_magnitude,
        alert_magnitude: args.alert_magnitude,
        radius_km: args.filter.radius,
        interval_secs: args.interval,
        page_size: args.filter.page_size,
        time_display: args.filter.time,
        notifier: alert::LocalNotifier {
            sound: args.sound,
            desktop: args.desktop,
        },
    };
    // Reject bad scalars before observer resolution touches the network.
    config.validate().context("invalid arguments")?;

    let observer = resolve_observer(&args.filter);
    let session = Session::new(observer.clone(), config.page_size);

    let store = Box::new(JsonFileStore::open(&args.store));
    let sender = Box::new(
        alert::HttpPushSender::new(args.push_gateway.as_str())
            .context("failed to create push sender")?,
    );

    let time_display = config.time_display;
    let format = args.filter.format;
    let local_tz = session.local_tz;

    let mut monitor = Monitor::new(config, session, store, sender)
        .context("failed to start monitor")?;

    println!("\x1b[1m🌍 QuakeWatch\x1b[0m");
    println!(
        "\x1b[2mFeed: {} | Near: {} | Times: {} | Press Ctrl+C to stop\x1b[0m",
        args.filter.feed.title(),
        observer.label,
        time_display.describe(local_tz)
    );
    println!("\x1b[2m─────────────────────────────────────────────────────────\x1b[0m");

    // The loop owns the cycle cadence; the stop flag is for embedders
    // and tests, the CLI simply runs until the process is killed.
    let stop = AtomicBool::new(false);
    monitor.run(&stop, |report, page| {
        if let Some(batch) = &report.local_alert {
            for event in &batch.summary {
                println!(
                    "\x1b[93m⚠ New quake M{:.1} • {} • {} • {:.0} km\x1b[0m",
                    event.magnitude,
                    event.place,
                    time_display.format(event.time_utc, local_tz),
                    event.distance_km
                );
            }
        }
        for outcome in &report.push_outcomes {
            match &outcome.result {
                Ok(()) => tracing::debug!("push delivered to {}", outcome.token),
                Err(e) => tracing::warn!("push to {} failed: {e}", outcome.token),
            }
        }

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = output::write_page(&mut handle, page, format, time_display, local_tz) {
            tracing::warn!("failed to write table: {e}");
        }
    });

    Ok(())
}

/// Execute the `tail` command - one-shot fetch and print.
fn cmd_tail(args: cli::TailArgs) -> Result<()> {
    // Reuse the watch validation for the shared scalars.
    let config = WatchConfig {
        feed: args.filter.feed,
        min_magnitude: args.filter.min_magnitude,
        radius_km: args.filter.radius,
        page_size: args.filter.page_size,
        time_display: args.filter.time,
        ..WatchConfig::default()
    };
    config.validate().context("invalid arguments")?;

    let observer = resolve_observer(&args.filter);
    let local_tz = geo::resolve_timezone(observer.latitude, observer.longitude);

    let client = FeedClient::new().context("failed to create feed client")?;
    let feed = client
        .fetch_feed(config.feed)
        .context("failed to fetch earthquake feed")?;

    let mut events: Vec<models::QuakeEvent> = models::normalize_feed(&feed, &observer)
        .into_iter()
        .filter(|e| e.in_range(config.min_magnitude, config.radius_km))
        .collect();
    models::sort_newest_first(&mut events);

    let page = pager::paginate(&events, config.page_size, args.page);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_page(
        &mut handle,
        &page,
        args.filter.format,
        config.time_display,
        local_tz,
    )?;

    Ok(())
}

/// Execute the `subscribe` command.
fn cmd_subscribe(args: cli::SubscribeArgs) -> Result<()> {
    let store = JsonFileStore::open(&args.store);
    store
        .upsert(&args.token, args.threshold)
        .context("failed to store subscriber")?;
    println!(
        "Subscribed {} at magnitude ≥ {:.1}",
        args.token, args.threshold
    );
    Ok(())
}

/// Execute the `unsubscribe` command.
fn cmd_unsubscribe(args: cli::UnsubscribeArgs) -> Result<()> {
    let store = JsonFileStore::open(&args.store);
    store
        .delete(&args.token)
        .context("failed to remove subscriber")?;
    println!("Unsubscribed {}", args.token);
    Ok(())
}

/// Execute the `subscribers` command.
fn cmd_subscribers(args: cli::SubscribersArgs) -> Result<()> {
    let store = JsonFileStore::open(&args.store);
    let mut listed = store.list().context("failed to read subscriber store")?;
    listed.sort_by(|a, b| a.0.cmp(&b.0));

    if listed.is_empty() {
        println!("No subscribers stored.");
        return Ok(());
    }
    for (token, threshold) in listed {
        println!("{token}  ≥ M{threshold:.1}");
    }
    Ok(())
}
