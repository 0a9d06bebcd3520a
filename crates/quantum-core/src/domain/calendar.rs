//! Trading calendar and settlement-day arithmetic.
//!
//! The Vietnamese exchanges (HOSE/HNX) trade Monday through Friday,
//! excluding public holidays. Settlement eligibility (T+2) is always
//! computed by counting trading days explicitly; calendar-day
//! approximations drift across weekends and the long Tet break.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Vietnamese public holidays, 2025.
///
/// Supplied as configuration data; this bundled list is the default for
/// the 2025 trading year.
pub const VN_HOLIDAYS_2025: &[(i32, u32, u32)] = &[
    (2025, 1, 1),  // New Year
    (2025, 1, 28), // Tet
    (2025, 1, 29),
    (2025, 1, 30),
    (2025, 1, 31),
    (2025, 2, 1),
    (2025, 2, 2),
    (2025, 2, 3),
    (2025, 4, 7),  // Hung Kings Commemoration
    (2025, 4, 30), // Reunification Day
    (2025, 5, 1),  // Labour Day
    (2025, 9, 2),  // National Day
    (2025, 9, 3),
];

/// Trading calendar: weekday schedule plus a configured holiday set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    /// Creates a calendar with no holidays (weekends only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar from an explicit holiday list.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Creates the calendar with the bundled 2025 Vietnamese holidays.
    pub fn vietnam_2025() -> Self {
        Self::with_holidays(VN_HOLIDAYS_2025.iter().filter_map(|&(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d)
        }))
    }

    /// Adds a holiday.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Number of configured holidays.
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }

    /// Whether the date is a configured holiday.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Whether the date is tradable: not Saturday, not Sunday, not a holiday.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        !weekend && !self.is_holiday(date)
    }

    /// Counts trading days strictly after `start` up to and including `end`.
    ///
    /// The start day itself is never counted (the entry day is T+0);
    /// `end` is counted when it is a trading day. Returns 0 when
    /// `end <= start`.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if end <= start {
            return 0;
        }

        let mut count = 0;
        let mut current = start + Days::new(1);
        while current <= end {
            if self.is_trading_day(current) {
                count += 1;
            }
            current = current + Days::new(1);
        }
        count
    }

    /// First date on which `min_holding_days` trading days have elapsed
    /// since `entry`.
    pub fn earliest_eligible_date(&self, entry: NaiveDate, min_holding_days: u32) -> NaiveDate {
        let mut current = entry;
        let mut counted = 0;
        while counted < min_holding_days {
            current = current + Days::new(1);
            if self.is_trading_day(current) {
                counted += 1;
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekends_excluded() {
        let calendar = TradingCalendar::new();
        // 2025-03-08 is a Saturday, 2025-03-09 a Sunday
        assert!(!calendar.is_trading_day(ymd(2025, 3, 8)));
        assert!(!calendar.is_trading_day(ymd(2025, 3, 9)));
        assert!(calendar.is_trading_day(ymd(2025, 3, 10)));
    }

    #[test]
    fn test_holidays_excluded() {
        let calendar = TradingCalendar::vietnam_2025();
        // Tet week
        assert!(!calendar.is_trading_day(ymd(2025, 1, 28)));
        assert!(!calendar.is_trading_day(ymd(2025, 1, 31)));
        // First session after Tet
        assert!(calendar.is_trading_day(ymd(2025, 2, 4)));
    }

    #[test]
    fn test_trading_days_between_excludes_entry_day() {
        let calendar = TradingCalendar::new();
        // Monday entry: Monday itself is T+0 and never counted
        let monday = ymd(2025, 3, 3);
        assert_eq!(calendar.trading_days_between(monday, monday), 0);
        assert_eq!(calendar.trading_days_between(monday, ymd(2025, 3, 4)), 1);
        assert_eq!(calendar.trading_days_between(monday, ymd(2025, 3, 5)), 2);
    }

    #[test]
    fn test_trading_days_between_skips_weekend() {
        let calendar = TradingCalendar::new();
        // Friday entry -> Tuesday is T+2 (weekend skipped)
        let friday = ymd(2025, 3, 7);
        assert_eq!(calendar.trading_days_between(friday, ymd(2025, 3, 10)), 1);
        assert_eq!(calendar.trading_days_between(friday, ymd(2025, 3, 11)), 2);
    }

    #[test]
    fn test_friday_entry_with_monday_holiday() {
        // Entry Friday, one holiday the following Monday, minimum 2
        // trading days: Sat/Sun/Mon excluded, Tue = day 1, Wed = day 2.
        let friday = ymd(2025, 4, 4);
        let monday_holiday = ymd(2025, 4, 7); // Hung Kings Commemoration
        let calendar = TradingCalendar::vietnam_2025();
        assert!(calendar.is_holiday(monday_holiday));

        assert_eq!(calendar.trading_days_between(friday, ymd(2025, 4, 8)), 1);
        assert_eq!(calendar.trading_days_between(friday, ymd(2025, 4, 9)), 2);
        assert_eq!(
            calendar.earliest_eligible_date(friday, 2),
            ymd(2025, 4, 9) // Wednesday
        );
    }

    #[test]
    fn test_tet_break_defers_eligibility() {
        let calendar = TradingCalendar::vietnam_2025();
        // Entry Monday Jan 27 2025: Tet closes Jan 28 - Feb 3.
        let entry = ymd(2025, 1, 27);
        assert_eq!(calendar.earliest_eligible_date(entry, 2), ymd(2025, 2, 5));
    }

    #[test]
    fn test_end_before_start_is_zero() {
        let calendar = TradingCalendar::new();
        assert_eq!(calendar.trading_days_between(ymd(2025, 3, 10), ymd(2025, 3, 7)), 0);
    }

    proptest! {
        /// is_trading_day excludes every Saturday, Sunday and configured
        /// holiday, and nothing else.
        #[test]
        fn prop_trading_day_classification(offset in 0u64..3650) {
            let calendar = TradingCalendar::vietnam_2025();
            let date = ymd(2020, 1, 1) + Days::new(offset);
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let holiday = calendar.is_holiday(date);
            prop_assert_eq!(calendar.is_trading_day(date), !weekend && !holiday);
        }

        /// trading_days_between equals the number of trading days in the
        /// half-open interval (start, end].
        #[test]
        fn prop_between_matches_daywise_scan(start_off in 0u64..1000, span in 0u64..200) {
            let calendar = TradingCalendar::vietnam_2025();
            let start = ymd(2024, 1, 1) + Days::new(start_off);
            let end = start + Days::new(span);

            let mut expected = 0;
            let mut day = start + Days::new(1);
            while day <= end {
                if calendar.is_trading_day(day) {
                    expected += 1;
                }
                day = day + Days::new(1);
            }
            prop_assert_eq!(calendar.trading_days_between(start, end), expected);
        }

        /// The earliest eligible date is itself a trading day and exactly
        /// satisfies the holding requirement.
        #[test]
        fn prop_earliest_eligible_is_exact(start_off in 0u64..1000, holding in 1u32..6) {
            let calendar = TradingCalendar::vietnam_2025();
            let entry = ymd(2024, 6, 1) + Days::new(start_off);
            let eligible = calendar.earliest_eligible_date(entry, holding);

            prop_assert!(calendar.is_trading_day(eligible));
            prop_assert_eq!(calendar.trading_days_between(entry, eligible), holding);
        }
    }
}
