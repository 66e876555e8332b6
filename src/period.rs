use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};

use crate::models::TimeWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ComparisonPeriod {
    #[default]
    Monthly,
    Yearly,
}

impl ComparisonPeriod {
    pub fn label(self) -> &'static str {
        match self {
            ComparisonPeriod::Monthly => "month-over-month",
            ComparisonPeriod::Yearly => "year-over-year",
        }
    }

    /// The calendar month or year containing `now`.
    pub fn current_window(self, now: DateTime<Utc>) -> TimeWindow {
        let start = self.period_start(now.date_naive());
        calendar_window(start, self.step())
    }

    /// The calendar month or year immediately before the one containing `now`.
    pub fn previous_window(self, now: DateTime<Utc>) -> TimeWindow {
        let start = self.period_start(now.date_naive()) - self.step();
        calendar_window(start, self.step())
    }

    fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            ComparisonPeriod::Monthly => date - Duration::days(i64::from(date.day0())),
            ComparisonPeriod::Yearly => date - Duration::days(i64::from(date.ordinal0())),
        }
    }

    fn step(self) -> Months {
        match self {
            ComparisonPeriod::Monthly => Months::new(1),
            ComparisonPeriod::Yearly => Months::new(12),
        }
    }
}

// Ends on the last microsecond before the next period, the finest
// resolution Postgres stores.
fn calendar_window(start: NaiveDate, length: Months) -> TimeWindow {
    let start_at = start.and_time(NaiveTime::MIN).and_utc();
    let next_at = (start + length).and_time(NaiveTime::MIN).and_utc();
    TimeWindow::new(start_at, next_at - Duration::microseconds(1))
}
