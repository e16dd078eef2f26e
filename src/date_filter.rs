//! Modified-time filters: relative keywords (`@d-3`, `@month`) and the
//! `@d(...)` calendar range mini-language.

use chrono::{Datelike, Local, NaiveDate, TimeZone};

/// Relative window anchored at "today" when the query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDate {
    Today,
    /// Today and the `n` days before it.
    DaysBack(u32),
    ThisMonth,
    /// This month and the `n` months before it.
    MonthsBack(u32),
    ThisYear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSpec {
    Relative(RelativeDate),
    /// Raw text between the parentheses of `@d(...)`; resolved against "today" at evaluation.
    Range(String),
}

pub fn relative_keyword(keyword: &str) -> Option<RelativeDate> {
    let rel = match keyword {
        "d" | "day" | "today" => RelativeDate::Today,
        "yesterday" => RelativeDate::DaysBack(1),
        "w" | "week" => RelativeDate::DaysBack(7),
        "m" | "month" => RelativeDate::ThisMonth,
        "y" | "year" => RelativeDate::ThisYear,
        _ => {
            let (unit, n) = keyword.split_once('-')?;
            let n: u32 = n.parse().ok()?;
            match unit {
                "d" | "day" if (1..=7).contains(&n) => RelativeDate::DaysBack(n),
                "m" | "month" if (1..=12).contains(&n) => RelativeDate::MonthsBack(n),
                _ => return None,
            }
        }
    };
    Some(rel)
}

impl RelativeDate {
    pub fn matches(self, file_day: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Today => file_day == today,
            Self::DaysBack(n) => {
                let start = today - chrono::Duration::days(i64::from(n));
                start <= file_day && file_day <= today
            }
            Self::ThisMonth => month_ordinal(file_day) == month_ordinal(today),
            Self::MonthsBack(n) => {
                let file_m = month_ordinal(file_day);
                let now_m = month_ordinal(today);
                now_m - i64::from(n) <= file_m && file_m <= now_m
            }
            Self::ThisYear => file_day.year() == today.year(),
        }
    }
}

fn month_ordinal(d: NaiveDate) -> i64 {
    i64::from(d.year()) * 12 + i64::from(d.month0())
}

/// Inclusive day window resolved from `@d(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolves range text; `None` when malformed (the filter then matches nothing).
    pub fn parse(raw: &str, today: NaiveDate) -> Option<Self> {
        let raw = raw.trim();
        if !raw.contains("..") {
            let (start, end) = unit_bounds(raw, today)?;
            return Some(Self { start, end });
        }

        let parts: Vec<&str> = raw.split("..").collect();
        let [start_raw, end_raw] = parts.as_slice() else {
            return None;
        };

        let start = match start_raw.trim() {
            "" => NaiveDate::from_ymd_opt(1970, 1, 1)?,
            s => unit_bounds(s, today)?.0,
        };
        let end = match end_raw.trim() {
            "" => today,
            s => unit_bounds(s, today)?.1,
        };
        Some(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// First and last day of `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, or today for `d`/`@d`.
fn unit_bounds(unit: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    if matches!(unit, "d" | "@d") {
        return Some((today, today));
    }
    let parts: Vec<&str> = unit.split('-').collect();
    if parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    match parts.as_slice() {
        [y] if y.len() == 4 => {
            let y: i32 = y.parse().ok()?;
            Some((
                NaiveDate::from_ymd_opt(y, 1, 1)?,
                NaiveDate::from_ymd_opt(y, 12, 31)?,
            ))
        }
        [y, m] if y.len() == 4 && m.len() == 2 => {
            let y: i32 = y.parse().ok()?;
            let m: u32 = m.parse().ok()?;
            let start = NaiveDate::from_ymd_opt(y, m, 1)?;
            let next = if m == 12 {
                NaiveDate::from_ymd_opt(y + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(y, m + 1, 1)?
            };
            Some((start, next.pred_opt()?))
        }
        [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
            let day = NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)?;
            Some((day, day))
        }
        _ => None,
    }
}

/// Local calendar day of an epoch-millisecond timestamp.
pub fn local_day(ms: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.date_naive())
}
