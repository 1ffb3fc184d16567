//! Business-day arithmetic for elapsed-time rule conditions.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::types::Timestamp;

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count the weekdays elapsed between two instants.
///
/// Calendar days strictly after `from` up to and including `until` are
/// examined; Saturdays and Sundays never count. When `from` itself falls
/// on a weekend, the first weekday reached afterwards is treated as part
/// of the weekend gap and is not counted either, so a request submitted on
/// Saturday has zero elapsed weekdays until the following Tuesday.
pub fn weekdays_elapsed(from: Timestamp, until: Timestamp) -> i64 {
    let start = from.date_naive();
    let end = until.date_naive();
    if end <= start {
        return 0;
    }

    let mut skip_first_weekday = !is_weekday(start);
    let mut count = 0i64;
    let mut day = start;
    while day < end {
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if !is_weekday(day) {
            continue;
        }
        if skip_first_weekday {
            skip_first_weekday = false;
        } else {
            count += 1;
        }
    }
    count
}
