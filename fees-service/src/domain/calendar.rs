//! Term calendar helpers.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Calendar days in [start, end] excluding weekends and break dates.
///
/// Break dates outside the range or falling on a weekend are ignored rather
/// than double-counted.
pub fn working_days(start: NaiveDate, end: NaiveDate, break_dates: &[NaiveDate]) -> u32 {
    if start > end {
        return 0;
    }

    let mut count = 0;
    let mut day = start;
    loop {
        let is_weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
        if !is_weekend && !break_dates.contains(&day) {
            count += 1;
        }
        if day == end {
            break;
        }
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn full_week_has_five_working_days() {
        // 2025-01-06 is a Monday.
        let days = working_days(date("2025-01-06"), date("2025-01-12"), &[]);
        assert_eq!(days, 5);
    }

    #[test]
    fn break_dates_are_excluded() {
        let breaks = vec![date("2025-01-08"), date("2025-01-09")];
        let days = working_days(date("2025-01-06"), date("2025-01-12"), &breaks);
        assert_eq!(days, 3);
    }

    #[test]
    fn weekend_break_date_not_double_counted() {
        // 2025-01-11 is a Saturday.
        let breaks = vec![date("2025-01-11")];
        let days = working_days(date("2025-01-06"), date("2025-01-12"), &breaks);
        assert_eq!(days, 5);
    }

    #[test]
    fn inverted_range_is_zero() {
        assert_eq!(working_days(date("2025-02-01"), date("2025-01-01"), &[]), 0);
    }

    #[test]
    fn single_weekday_counts_once() {
        assert_eq!(
            working_days(date("2025-01-06"), date("2025-01-06"), &[]),
            1
        );
    }
}
