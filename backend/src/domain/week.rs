use chrono::{Datelike, Duration, NaiveDate};
use shared::WeekWindow;

/// Compute the Saturday..Friday settlement window containing `reference`.
///
/// start = reference - ((weekday(reference) - Saturday) mod 7); end = start + 6.
/// Every day of a given span maps to the same window, so re-running a
/// settlement later in the week aggregates over identical bounds.
pub fn week_window(reference: NaiveDate) -> WeekWindow {
    // num_days_from_sunday: Sunday = 0 .. Saturday = 6
    let weekday = reference.weekday().num_days_from_sunday();
    let offset_to_saturday = (weekday + 7 - 6) % 7;

    let start = reference - Duration::days(i64::from(offset_to_saturday));
    let end = start + Duration::days(6);

    WeekWindow { start, end }
}
