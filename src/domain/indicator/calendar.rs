//! Calendar features derived from each bar's UTC open time.
//!
//! - Time: `HOUR`, `MINUTE`, `DAY_OF_WEEK` (Monday = 0), `DAY_OF_MONTH`,
//!   `MONTH`
//! - Moon: `MOON_PHASE` in [0, 1) with 0 = new and 0.5 = full,
//!   `IS_FULL_MOON` / `IS_NEW_MOON` within one day of the exact phase
//! - US market holidays: `IS_HOLIDAY`, `DAYS_TO_HOLIDAY`
//! - FOMC decision days: `IS_FOMC_DAY`, `DAYS_TO_FOMC`, `DAYS_SINCE_FOMC`;
//!   NaN outside the years covered by the schedule

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{bool_value, ResultSeries};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Timelike, Utc, Weekday};

pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;
const PHASE_WINDOW_DAYS: f64 = 1.0;

const FOMC_DATES: &[(i32, u32, u32)] = &[
    (2020, 1, 29),
    (2020, 3, 3),
    (2020, 3, 15),
    (2020, 4, 29),
    (2020, 6, 10),
    (2020, 7, 29),
    (2020, 9, 16),
    (2020, 11, 5),
    (2020, 12, 16),
    (2021, 1, 27),
    (2021, 3, 17),
    (2021, 4, 28),
    (2021, 6, 16),
    (2021, 7, 28),
    (2021, 9, 22),
    (2021, 11, 3),
    (2021, 12, 15),
    (2022, 1, 26),
    (2022, 3, 16),
    (2022, 5, 4),
    (2022, 6, 15),
    (2022, 7, 27),
    (2022, 9, 21),
    (2022, 11, 2),
    (2022, 12, 14),
    (2023, 2, 1),
    (2023, 3, 22),
    (2023, 5, 3),
    (2023, 6, 14),
    (2023, 7, 26),
    (2023, 9, 20),
    (2023, 11, 1),
    (2023, 12, 13),
    (2024, 1, 31),
    (2024, 3, 20),
    (2024, 5, 1),
    (2024, 6, 12),
    (2024, 7, 31),
    (2024, 9, 18),
    (2024, 11, 7),
    (2024, 12, 18),
    (2025, 1, 29),
    (2025, 3, 19),
    (2025, 5, 7),
    (2025, 6, 18),
    (2025, 7, 30),
    (2025, 9, 17),
    (2025, 10, 29),
    (2025, 12, 10),
    (2026, 1, 28),
    (2026, 3, 18),
    (2026, 4, 29),
    (2026, 6, 17),
    (2026, 7, 29),
    (2026, 9, 16),
    (2026, 10, 28),
    (2026, 12, 9),
];
const FOMC_FIRST_YEAR: i32 = 2020;
const FOMC_LAST_YEAR: i32 = 2026;

fn per_bar(ctx: &DataContext<'_>, f: impl Fn(DateTime<Utc>) -> f64) -> ResultSeries {
    ResultSeries::Flat(ctx.candles.iter().map(|c| f(c.timestamp)).collect())
}

pub fn compute_hour(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| ts.hour() as f64))
}

pub fn compute_minute(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| ts.minute() as f64))
}

pub fn compute_day_of_week(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| ts.weekday().num_days_from_monday() as f64))
}

pub fn compute_day_of_month(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| ts.day() as f64))
}

pub fn compute_month(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| ts.month() as f64))
}

/// Lunar phase in [0, 1), measured from the new moon of 2000-01-06 18:14 UTC.
pub fn moon_phase(ts: DateTime<Utc>) -> f64 {
    let reference = Utc
        .with_ymd_and_hms(2000, 1, 6, 18, 14, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH);
    let days = (ts - reference).num_seconds() as f64 / 86_400.0;
    (days / SYNODIC_MONTH_DAYS).rem_euclid(1.0)
}

pub fn compute_moon_phase(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, moon_phase))
}

pub fn compute_is_full_moon(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| {
        let days_off = (moon_phase(ts) - 0.5).abs() * SYNODIC_MONTH_DAYS;
        bool_value(days_off <= PHASE_WINDOW_DAYS)
    }))
}

pub fn compute_is_new_moon(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_bar(ctx, |ts| {
        let phase = moon_phase(ts);
        let days_off = phase.min(1.0 - phase) * SYNODIC_MONTH_DAYS;
        bool_value(days_off <= PHASE_WINDOW_DAYS)
    }))
}

fn last_weekday_of(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    last.checked_sub_signed(TimeDelta::days(back as i64))
}

/// US market holidays for one year, unobserved (on the calendar date).
pub fn us_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = [
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3),
        NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3),
        last_weekday_of(year, 5, Weekday::Mon),
        NaiveDate::from_ymd_opt(year, 7, 4),
        NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1),
        NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4),
        NaiveDate::from_ymd_opt(year, 12, 25),
    ]
    .into_iter()
    .flatten()
    .collect();
    days.sort();
    days
}

/// Sorted holidays covering every bar plus the following year.
fn holiday_table(ctx: &DataContext<'_>) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (ctx.candles.first(), ctx.candles.last()) else {
        return Vec::new();
    };
    (first.timestamp.year()..=last.timestamp.year() + 1)
        .flat_map(us_holidays)
        .collect()
}

pub fn compute_is_holiday(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let table = holiday_table(ctx);
    Ok(per_bar(ctx, |ts| {
        bool_value(table.binary_search(&ts.date_naive()).is_ok())
    }))
}

pub fn compute_days_to_holiday(
    ctx: &DataContext<'_>,
    _: &[f64],
) -> Result<ResultSeries, EvalError> {
    let table = holiday_table(ctx);
    Ok(per_bar(ctx, |ts| {
        let today = ts.date_naive();
        let idx = table.partition_point(|d| *d < today);
        table
            .get(idx)
            .map_or(f64::NAN, |next| (*next - today).num_days() as f64)
    }))
}

fn fomc_dates() -> Vec<NaiveDate> {
    FOMC_DATES
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
}

fn in_fomc_schedule(date: NaiveDate) -> bool {
    (FOMC_FIRST_YEAR..=FOMC_LAST_YEAR).contains(&date.year())
}

pub fn compute_is_fomc_day(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let dates = fomc_dates();
    Ok(per_bar(ctx, |ts| {
        let today = ts.date_naive();
        if !in_fomc_schedule(today) {
            return f64::NAN;
        }
        bool_value(dates.binary_search(&today).is_ok())
    }))
}

pub fn compute_days_to_fomc(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let dates = fomc_dates();
    Ok(per_bar(ctx, |ts| {
        let today = ts.date_naive();
        if !in_fomc_schedule(today) {
            return f64::NAN;
        }
        let idx = dates.partition_point(|d| *d < today);
        dates
            .get(idx)
            .map_or(f64::NAN, |next| (*next - today).num_days() as f64)
    }))
}

pub fn compute_days_since_fomc(
    ctx: &DataContext<'_>,
    _: &[f64],
) -> Result<ResultSeries, EvalError> {
    let dates = fomc_dates();
    Ok(per_bar(ctx, |ts| {
        let today = ts.date_naive();
        if !in_fomc_schedule(today) {
            return f64::NAN;
        }
        let idx = dates.partition_point(|d| *d <= today);
        if idx == 0 {
            f64::NAN
        } else {
            (today - dates[idx - 1]).num_days() as f64
        }
    }))
}
