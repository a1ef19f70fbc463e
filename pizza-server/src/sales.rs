//! Sales aggregation over paid orders (UTC calendar periods)

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesTotals {
    pub orders: u64,
    pub revenue: Decimal,
}

impl SalesTotals {
    fn add(&mut self, amount: Decimal) {
        self.orders += 1;
        self.revenue += amount;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub today: SalesTotals,
    /// Week starting Sunday
    pub week: SalesTotals,
    pub month: SalesTotals,
    pub all_time: SalesTotals,
}

/// Millisecond starts of the current day, week and month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodStarts {
    pub day: i64,
    pub week: i64,
    pub month: i64,
}

fn midnight_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |dt| Utc.from_utc_datetime(&dt).timestamp_millis())
}

pub fn period_starts(now: DateTime<Utc>) -> PeriodStarts {
    let today = now.date_naive();
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let month_start = today.with_day(1).unwrap_or(today);
    PeriodStarts {
        day: midnight_ms(today),
        week: midnight_ms(week_start),
        month: midnight_ms(month_start),
    }
}

/// Bucket `(created_at_ms, total_price)` rows into the periods around `now`
pub fn aggregate(rows: &[(i64, Decimal)], now: DateTime<Utc>) -> SalesReport {
    let starts = period_starts(now);
    let mut report = SalesReport::default();

    for &(created_at, amount) in rows {
        report.all_time.add(amount);
        if created_at >= starts.month {
            report.month.add(amount);
        }
        if created_at >= starts.week {
            report.week.add(amount);
        }
        if created_at >= starts.day {
            report.today.add(amount);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn ms(y: i32, m: u32, d: u32, h: u32) -> i64 {
        at(y, m, d, h).timestamp_millis()
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2025-06-18 is a Wednesday
        let starts = period_starts(at(2025, 6, 18, 15));
        assert_eq!(starts.day, ms(2025, 6, 18, 0));
        assert_eq!(starts.week, ms(2025, 6, 15, 0));
        assert_eq!(starts.month, ms(2025, 6, 1, 0));
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        let starts = period_starts(at(2025, 6, 15, 8));
        assert_eq!(starts.week, starts.day);
    }

    #[test]
    fn week_may_start_in_previous_month() {
        // 2025-07-02 is a Wednesday; its week began 2025-06-29
        let starts = period_starts(at(2025, 7, 2, 12));
        assert_eq!(starts.week, ms(2025, 6, 29, 0));
        assert_eq!(starts.month, ms(2025, 7, 1, 0));
    }

    #[test]
    fn rows_are_bucketed_by_period() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        let rows = vec![
            (ms(2025, 6, 18, 9), d("100")),  // today
            (ms(2025, 6, 16, 9), d("50.5")), // this week
            (ms(2025, 6, 2, 9), d("20")),    // this month
            (ms(2024, 12, 31, 9), d("5")),   // earlier
        ];
        let report = aggregate(&rows, at(2025, 6, 18, 15));

        assert_eq!(report.today, SalesTotals { orders: 1, revenue: d("100") });
        assert_eq!(report.week, SalesTotals { orders: 2, revenue: d("150.5") });
        assert_eq!(report.month, SalesTotals { orders: 3, revenue: d("170.5") });
        assert_eq!(report.all_time, SalesTotals { orders: 4, revenue: d("175.5") });
    }
}
