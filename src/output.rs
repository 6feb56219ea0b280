//! Table output for earthquake events.
//!
//! Supports human-readable (with magnitude colors), JSON, and NDJSON
//! formats. Display-time conversion happens here and only here: the
//! pipeline filters and sorts on UTC instants.

use std::io::{self, Write};

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::QuakeEvent;
use crate::pager::Page;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude colors match the dashboard styling: green below 4,
// orange below 6, bold red at 6 and above.
const GREEN: &str = "\x1b[92m";
const ORANGE: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";

/// Reference cities per whole-hour GMT offset, for the offset picker.
pub const GMT_REFERENCE: &[(i32, &str)] = &[
    (-12, "Baker Island"),
    (-11, "American Samoa"),
    (-10, "Hawaii"),
    (-9, "Alaska"),
    (-8, "Los Angeles, Vancouver"),
    (-7, "Denver, Phoenix"),
    (-6, "Chicago, Mexico City"),
    (-5, "New York, Peru, Colombia"),
    (-4, "Santiago, Caracas"),
    (-3, "Buenos Aires, São Paulo"),
    (-2, "South Georgia"),
    (-1, "Azores"),
    (0, "London, Lisbon, Accra"),
    (1, "Berlin, Paris, Madrid"),
    (2, "Athens, Cairo, Johannesburg"),
    (3, "Moscow, Nairobi"),
    (4, "Dubai, Baku"),
    (5, "Pakistan, Maldives"),
    (6, "Bangladesh, Kazakhstan"),
    (7, "Thailand, Vietnam, Jakarta"),
    (8, "China, Singapore, Philippines"),
    (9, "Japan, Korea"),
    (10, "Sydney, Papua New Guinea"),
    (11, "Solomon Islands"),
    (12, "Fiji, New Zealand"),
    (13, "Samoa, Tonga"),
    (14, "Kiribati"),
];

/// How event times are shown. Presentation-only: never affects
/// filtering or sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeDisplay {
    /// Observer's resolved local zone
    #[default]
    Local,
    /// UTC unchanged
    Utc,
    /// Fixed whole-hour GMT offset
    Offset(i32),
}

impl TimeDisplay {
    /// Format a UTC instant for display.
    #[must_use]
    pub fn format(self, t: DateTime<Utc>, local_tz: Tz) -> String {
        const FMT: &str = "%Y-%m-%d %H:%M:%S";
        match self {
            Self::Local => t.with_timezone(&local_tz).format(FMT).to_string(),
            Self::Utc => t.format(FMT).to_string(),
            Self::Offset(hours) => {
                let offset =
                    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
                t.with_timezone(&offset).format(FMT).to_string()
            }
        }
    }
}

impl TimeDisplay {
    /// Human-readable description of the zone in effect, for banners.
    #[must_use]
    pub fn describe(self, local_tz: Tz) -> String {
        match self {
            Self::Local => local_tz.name().to_string(),
            Self::Utc => "UTC".to_string(),
            Self::Offset(hours) => GMT_REFERENCE
                .iter()
                .find(|(o, _)| *o == hours)
                .map_or_else(
                    || format!("GMT{hours:+}"),
                    |(_, reference)| format!("GMT{hours:+} ({reference})"),
                ),
        }
    }
}

impl std::str::FromStr for TimeDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "local" => return Ok(Self::Local),
            "utc" => return Ok(Self::Utc),
            _ => {}
        }

        let trimmed = lower.strip_prefix("gmt").unwrap_or(&lower);
        let hours: i32 = trimmed.parse().map_err(|_| {
            format!("unknown time display: {s} (expected: local, utc, or a GMT offset like +8)")
        })?;
        if !(-12..=14).contains(&hours) {
            return Err(format!("GMT offset {hours} out of range [-12, 14]"));
        }
        Ok(Self::Offset(hours))
    }
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Serialized table row.
#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    id: &'a str,
    time: String,
    magnitude: f64,
    place: &'a str,
    latitude: f64,
    longitude: f64,
    distance_km: f64,
}

impl<'a> OutputRow<'a> {
    fn new(event: &'a QuakeEvent, display: TimeDisplay, local_tz: Tz) -> Self {
        Self {
            id: &event.id,
            time: display.format(event.time_utc, local_tz),
            magnitude: event.magnitude,
            place: &event.place,
            latitude: event.latitude,
            longitude: event.longitude,
            distance_km: event.distance_km,
        }
    }
}

fn magnitude_color(mag: f64) -> (&'static str, &'static str) {
    if mag >= 6.0 {
        (RED, BOLD)
    } else if mag >= 4.0 {
        (ORANGE, "")
    } else {
        (GREEN, "")
    }
}

/// Write one page as a human-readable table with a page header.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_page_human<W: Write>(
    writer: &mut W,
    page: &Page<'_>,
    display: TimeDisplay,
    local_tz: Tz,
) -> io::Result<()> {
    writeln!(
        writer,
        "{DIM}Page {}/{} ({} on this page){RESET}",
        page.page,
        page.total_pages,
        page.items.len()
    )?;

    for event in page.items {
        let (color, weight) = magnitude_color(event.magnitude);
        let time = display.format(event.time_utc, local_tz);
        writeln!(
            writer,
            "{color}{weight}M{:.1}{RESET} │ {time} │ {DIM}{:>6.1} km{RESET} │ {:.2}, {:.2} │ {}",
            event.magnitude, event.distance_km, event.latitude, event.longitude, event.place
        )?;
    }
    Ok(())
}

/// Write one page as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_page_json<W: Write>(
    writer: &mut W,
    page: &Page<'_>,
    display: TimeDisplay,
    local_tz: Tz,
) -> io::Result<()> {
    let rows: Vec<OutputRow<'_>> = page
        .items
        .iter()
        .map(|e| OutputRow::new(e, display, local_tz))
        .collect();
    let json = serde_json::to_string_pretty(&rows)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write one page as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_page_ndjson<W: Write>(
    writer: &mut W,
    page: &Page<'_>,
    display: TimeDisplay,
    local_tz: Tz,
) -> io::Result<()> {
    for event in page.items {
        let row = OutputRow::new(event, display, local_tz);
        let json = serde_json::to_string(&row)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write a page in the selected format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_page<W: Write>(
    writer: &mut W,
    page: &Page<'_>,
    format: Format,
    display: TimeDisplay,
    local_tz: Tz,
) -> io::Result<()> {
    match format {
        Format::Human => write_page_human(writer, page, display, local_tz),
        Format::Json => write_page_json(writer, page, display, local_tz),
        Format::Ndjson => write_page_ndjson(writer, page, display, local_tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_time_display_parse() {
        assert_eq!("local".parse::<TimeDisplay>().unwrap(), TimeDisplay::Local);
        assert_eq!("UTC".parse::<TimeDisplay>().unwrap(), TimeDisplay::Utc);
        assert_eq!("+8".parse::<TimeDisplay>().unwrap(), TimeDisplay::Offset(8));
        assert_eq!(
            "gmt-5".parse::<TimeDisplay>().unwrap(),
            TimeDisplay::Offset(-5)
        );
        assert!("gmt+15".parse::<TimeDisplay>().is_err());
        assert!("noon".parse::<TimeDisplay>().is_err());
    }

    #[test]
    fn test_time_display_conversion() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(
            TimeDisplay::Utc.format(t, chrono_tz::UTC),
            "2024-06-01 12:00:00"
        );
        // Manila is UTC+8 year-round.
        assert_eq!(
            TimeDisplay::Local.format(t, chrono_tz::Asia::Manila),
            "2024-06-01 20:00:00"
        );
        assert_eq!(
            TimeDisplay::Offset(-5).format(t, chrono_tz::UTC),
            "2024-06-01 07:00:00"
        );
    }

    #[test]
    fn test_gmt_reference_covers_full_range() {
        let offsets: Vec<i32> = GMT_REFERENCE.iter().map(|(o, _)| *o).collect();
        assert_eq!(offsets.first(), Some(&-12));
        assert_eq!(offsets.last(), Some(&14));
        assert_eq!(offsets.len(), 27);
    }
}
