//! Review date scheduling.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};

use super::ReviewCycle;

pub const DEFAULT_FIRST_REVIEW_DAYS: u32 = 7;
pub const DEFAULT_SECOND_REVIEW_DAYS: u32 = 30;
/// Longest accepted interval, roughly a century.
pub const MAX_REVIEW_INTERVAL_DAYS: u32 = 36_500;

/// Intervals between a reward and the next review, snapped to midnight in
/// the user's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSchedule {
    first_interval_days: u32,
    second_interval_days: u32,
    utc_offset: FixedOffset,
}

impl Default for ReviewSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_REVIEW_DAYS, DEFAULT_SECOND_REVIEW_DAYS, Utc.fix())
    }
}

impl ReviewSchedule {
    pub fn new(first_interval_days: u32, second_interval_days: u32, utc_offset: FixedOffset) -> Self {
        Self {
            first_interval_days,
            second_interval_days,
            utc_offset,
        }
    }

    pub fn interval_days(&self, cycle: ReviewCycle) -> u32 {
        match cycle {
            ReviewCycle::First => self.first_interval_days,
            ReviewCycle::Second => self.second_interval_days,
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Start of the day `interval_days(cycle)` days after `now`, or `None`
    /// when that day is past the representable date range.
    pub fn next_review_at(
        &self,
        now: DateTime<Utc>,
        cycle: ReviewCycle,
    ) -> Option<DateTime<Utc>> {
        let interval = Duration::try_days(i64::from(self.interval_days(cycle)))?;
        let target = now.checked_add_signed(interval)?;
        Some(start_of_day(target, self.utc_offset))
    }
}

/// Midnight of the local day containing `at`, expressed in UTC.
pub fn start_of_day(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = at.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
    let utc_naive = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_day_in_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 18, 30, 5).unwrap();
        assert_eq!(
            start_of_day(at, Utc.fix()),
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn start_of_day_respects_offset() {
        // 23:30 UTC is already the next day at UTC+2.
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 23, 30, 0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            start_of_day(at, plus_two),
            Utc.with_ymd_and_hms(2024, 3, 4, 22, 0, 0).unwrap()
        );

        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            start_of_day(at, minus_five),
            Utc.with_ymd_and_hms(2024, 3, 4, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_review_uses_cycle_interval() {
        let schedule = ReviewSchedule::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();
        assert_eq!(
            schedule.next_review_at(now, ReviewCycle::First),
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap())
        );
        assert_eq!(
            schedule.next_review_at(now, ReviewCycle::Second),
            Some(Utc.with_ymd_and_hms(2024, 4, 3, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn next_review_past_date_range_is_none() {
        let schedule = ReviewSchedule::new(u32::MAX, 100_000_000, Utc.fix());
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap();
        assert_eq!(schedule.next_review_at(now, ReviewCycle::First), None);
        assert_eq!(schedule.next_review_at(now, ReviewCycle::Second), None);
    }
}
