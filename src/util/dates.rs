use chrono::{Duration, NaiveDate};

/// Split a lookback window into (start, end) chunks, oldest first.
///
/// CloudWatch limits the span of a single statistics query, so large windows
/// are walked in chunks. The last chunk may be shorter than `chunk_days`.
pub fn date_ranges(end_date: NaiveDate, days_back: i64, chunk_days: i64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let mut current_end = end_date;
    let mut days_remaining = days_back;

    while days_remaining > 0 {
        let chunk = chunk_days.min(days_remaining);
        let current_start = current_end - Duration::days(chunk);
        ranges.push((current_start, current_end));
        current_end = current_start;
        days_remaining -= chunk;
    }

    ranges.reverse();
    ranges
}
