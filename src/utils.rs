use chrono::{Datelike, NaiveDate};

/// `MM-YY` bucket label for a date, e.g. `2025-10-16` -> `"10-25"`.
pub fn month_label(date: NaiveDate) -> String {
    format_month_label(date.year(), date.month())
}

pub fn format_month_label(year: i32, month: u32) -> String {
    format!("{:02}-{:02}", month, year.rem_euclid(100))
}

/// The (year, month) pair `n` calendar months before the month of `date`.
pub fn months_back(date: NaiveDate, n: u32) -> (i32, u32) {
    let index = date.year() * 12 + date.month0() as i32 - n as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// The `count` calendar months ending with the month of `now`, oldest first.
pub fn trailing_months(now: NaiveDate, count: u32) -> Vec<(i32, u32)> {
    (0..count).rev().map(|n| months_back(now, n)).collect()
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Parses the leading `YYYY-MM-DD` of a date or ISO datetime string.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
