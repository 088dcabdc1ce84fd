//! Calendar periods cut into fixed-width buckets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::domain::PeriodKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("{0} does not exist in the local time zone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("no calendar date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 30,
    }
}

/// Closed interval `[start, end]` of epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub start: i64,
    pub end: i64,
}

/// `N + 1` ascending boundaries delimiting `N` buckets of `step_seconds`,
/// except the last one which stops at the exact end of the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodBuckets {
    pub kind: PeriodKind,
    pub step_seconds: i64,
    pub boundaries: Vec<i64>,
}

impl PeriodBuckets {
    /// Boundaries every `kind.step_seconds()` from `start`, then `end`.
    pub fn from_span(kind: PeriodKind, start: i64, end: i64) -> Self {
        let step_seconds = kind.step_seconds();
        let mut boundaries: Vec<i64> = (start..end).step_by(step_seconds as usize).collect();
        boundaries.push(end);
        Self {
            kind,
            step_seconds,
            boundaries,
        }
    }

    pub fn start(&self) -> i64 {
        self.boundaries[0]
    }

    pub fn end(&self) -> i64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    pub fn span_seconds(&self) -> i64 {
        self.end() - self.start()
    }

    pub fn bucket_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.boundaries
            .windows(2)
            .map(|w| Bucket { start: w[0], end: w[1] })
    }

    pub fn label(&self) -> &'static str {
        self.kind.bucket_label()
    }
}

/// First and last calendar day of the period containing `date`.
pub fn period_days(kind: PeriodKind, date: NaiveDate) -> Result<(NaiveDate, NaiveDate), PeriodError> {
    match kind {
        PeriodKind::Daily => Ok((date, date)),
        PeriodKind::Weekly => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            Ok((monday, monday + Duration::days(6)))
        }
        PeriodKind::Monthly => {
            let (year, month) = (date.year(), date.month());
            let last = days_in_month(year, month);
            let day = |d: u32| {
                NaiveDate::from_ymd_opt(year, month, d).ok_or(PeriodError::InvalidDate {
                    year,
                    month,
                    day: d,
                })
            };
            Ok((day(1)?, day(last)?))
        }
    }
}

/// Epoch seconds of a local wall-clock time. A time skipped by a DST jump
/// resolves to one hour later.
fn local_timestamp<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<i64, PeriodError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.timestamp())
        .ok_or(PeriodError::NonexistentLocalTime(naive))
}

/// Buckets spanning the whole period that contains `reference`, in the
/// reference's time zone: first day 00:00:00 to last day 23:59:59.
pub fn bucket_period<Tz: TimeZone>(
    kind: PeriodKind,
    reference: &DateTime<Tz>,
) -> Result<PeriodBuckets, PeriodError> {
    let tz = reference.timezone();
    let (first, last) = period_days(kind, reference.date_naive())?;

    let invalid = |d: NaiveDate| PeriodError::InvalidDate {
        year: d.year(),
        month: d.month(),
        day: d.day(),
    };
    let start = first.and_hms_opt(0, 0, 0).ok_or_else(|| invalid(first))?;
    let end = last.and_hms_opt(23, 59, 59).ok_or_else(|| invalid(last))?;

    Ok(PeriodBuckets::from_span(
        kind,
        local_timestamp(&tz, start)?,
        local_timestamp(&tz, end)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use rstest::rstest;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[rstest]
    #[case(2024, true)]
    #[case(2023, false)]
    #[case(1900, false)]
    #[case(2000, true)]
    #[case(2100, false)]
    fn test_leap_years(#[case] year: i32, #[case] leap: bool) {
        assert_eq!(is_leap_year(year), leap);
    }

    #[rstest]
    #[case(2024, 2, 29)]
    #[case(2023, 2, 28)]
    #[case(2023, 4, 30)]
    #[case(2023, 12, 31)]
    fn test_days_in_month(#[case] year: i32, #[case] month: u32, #[case] days: u32) {
        assert_eq!(days_in_month(year, month), days);
    }

    #[test]
    fn test_daily_hourly_buckets() {
        let p = bucket_period(PeriodKind::Daily, &utc(2024, 3, 10, 12)).unwrap();
        let midnight = utc(2024, 3, 10, 0).timestamp();
        assert_eq!(p.step_seconds, 3600);
        assert_eq!(p.bucket_count(), 24);
        assert_eq!(p.start(), midnight);
        assert_eq!(p.end(), midnight + 86_399);
        assert_eq!(p.boundaries[23], midnight + 23 * 3600);
        assert_eq!(p.label(), "hourly");

        let last = p.buckets().last().unwrap();
        assert_eq!(last.end - last.start, 3599);
    }

    #[test]
    fn test_weekly_starts_on_monday() {
        // 2024-02-15 is a Thursday
        let p = bucket_period(PeriodKind::Weekly, &utc(2024, 2, 15, 9)).unwrap();
        assert_eq!(p.start(), utc(2024, 2, 12, 0).timestamp());
        assert_eq!(p.end(), utc(2024, 2, 18, 0).timestamp() + 86_399);
        assert_eq!(p.bucket_count(), 7);
        assert_eq!(p.label(), "daily");
    }

    #[test]
    fn test_weekly_across_month_boundary() {
        // Sunday 2024-03-03 belongs to the week starting Monday 2024-02-26
        let p = bucket_period(PeriodKind::Weekly, &utc(2024, 3, 3, 20)).unwrap();
        assert_eq!(p.start(), utc(2024, 2, 26, 0).timestamp());
        assert_eq!(p.end(), utc(2024, 3, 3, 0).timestamp() + 86_399);
    }

    #[rstest]
    #[case::leap(2024, 29)]
    #[case::common(2023, 28)]
    fn test_monthly_february(#[case] year: i32, #[case] last_day: u32) {
        let p = bucket_period(PeriodKind::Monthly, &utc(year, 2, 15, 0)).unwrap();
        assert_eq!(p.start(), utc(year, 2, 1, 0).timestamp());
        assert_eq!(p.end(), utc(year, 2, last_day, 0).timestamp() + 86_399);
        assert_eq!(p.bucket_count(), last_day as usize);
    }

    #[test]
    fn test_local_midnight_in_offset_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let reference = tz.with_ymd_and_hms(2024, 6, 10, 1, 0, 0).unwrap();
        let p = bucket_period(PeriodKind::Daily, &reference).unwrap();
        assert_eq!(p.start(), utc(2024, 6, 9, 22).timestamp());
    }

    #[test]
    fn test_buckets_chain() {
        let p = PeriodBuckets::from_span(PeriodKind::Daily, 0, 7_000);
        assert_eq!(p.boundaries, vec![0, 3600, 7_000]);
        let buckets: Vec<Bucket> = p.buckets().collect();
        assert_eq!(buckets[1], Bucket { start: 3600, end: 7_000 });
        assert_eq!(p.span_seconds(), 7_000);
    }
}
