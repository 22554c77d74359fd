//! Date helpers

use chrono::{Datelike, Local, NaiveDate};

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current calendar year in the local timezone
pub fn current_year() -> i32 {
    today().year()
}

/// ISO-8601 calendar date (`YYYY-MM-DD`)
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
