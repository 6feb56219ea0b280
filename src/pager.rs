//! Pagination over the filtered, sorted event list.
//!
//! Slicing is deterministic: identical inputs always yield the
//! identical slice, and a requested page outside the valid range clamps
//! instead of erroring.

use crate::models::QuakeEvent;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// Events on this page, borrowed from the filtered list
    pub items: &'a [QuakeEvent],
    /// The clamped 1-indexed page number actually served
    pub page: usize,
    /// Total number of pages (at least 1, even for an empty list)
    pub total_pages: usize,
}

/// Slice a sorted, filtered event list into one page.
///
/// `total_pages = max(1, ceil(len / page_size))`; the requested page is
/// clamped to `[1, total_pages]` and the slice bounds are clipped to
/// the list length.
///
/// # Panics
///
/// Panics if `page_size` is zero.
#[must_use]
pub fn paginate(events: &[QuakeEvent], page_size: usize, requested_page: usize) -> Page<'_> {
    assert!(page_size > 0, "page_size must be positive");

    let total_pages = events.len().div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(events.len());
    let start = start.min(events.len());

    Page {
        items: &events[start..end],
        page,
        total_pages,
    }
}

/// Session pagination state for the watch loop.
///
/// The current page survives across refresh cycles and is re-clamped
/// whenever the filtered result count changes, down to 1 when the
/// filtered set is empty.
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    pub page: usize,
    pub page_size: usize,
}

impl PageCursor {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self { page: 1, page_size }
    }

    /// Serve the current page, persisting the clamped page number.
    pub fn current<'a>(&mut self, events: &'a [QuakeEvent]) -> Page<'a> {
        let page = paginate(events, self.page_size, self.page);
        self.page = page.page;
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn events(n: usize) -> Vec<QuakeEvent> {
        (0..n)
            .map(|i| QuakeEvent {
                id: format!("q{i}"),
                time_utc: Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap(),
                magnitude: 1.0,
                place: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                distance_km: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_pages_partition_the_list() {
        let list = events(25);
        let first = paginate(&list, 10, 1);
        assert_eq!(first.total_pages, 3);

        let mut total = 0;
        for p in 1..=first.total_pages {
            let page = paginate(&list, 10, p);
            // Every page except possibly the last is full.
            if p < first.total_pages {
                assert_eq!(page.items.len(), 10);
            }
            total += page.items.len();
        }
        assert_eq!(total, 25);
    }

    #[test]
    fn test_out_of_range_page_clamps() {
        let list = events(25);

        let over = paginate(&list, 10, 5);
        assert_eq!(over.page, 3);
        assert_eq!(over.items.len(), 5);
        assert_eq!(over.items[0].id, "q20");
        assert_eq!(over.items[4].id, "q24");

        let under = paginate(&list, 10, 0);
        assert_eq!(under.page, 1);
    }

    #[test]
    fn test_empty_list_serves_page_one() {
        let list = events(0);
        let page = paginate(&list, 10, 7);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let list = events(13);
        let a = paginate(&list, 5, 2);
        let b = paginate(&list, 5, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cursor_reclamps_when_list_shrinks() {
        let mut cursor = PageCursor::new(10);
        let big = events(45);
        cursor.page = 5;
        assert_eq!(cursor.current(&big).page, 5);

        // Filtered set shrinks; cursor clamps and stays clamped.
        let small = events(12);
        assert_eq!(cursor.current(&small).page, 2);
        assert_eq!(cursor.page, 2);

        let empty = events(0);
        assert_eq!(cursor.current(&empty).page, 1);
    }
}
