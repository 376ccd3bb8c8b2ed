//! Billing month enumeration and period addressing.
//!
//! The organizer pages address a month either by the epoch second of its first
//! midnight in JST (revenue reports) or by an explicit first-day/last-day date
//! range (KPI report). Midnights are constructed zone-aware via `chrono-tz`;
//! naive construction shifted by a hand-written offset gives wrong results
//! around historical offset changes.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::models::{BillingPeriod, PeriodAddressing};

pub const JST: Tz = chrono_tz::Asia::Tokyo;

pub fn now_jst() -> DateTime<Tz> {
    chrono::Utc::now().with_timezone(&JST)
}

/// Epoch second of `Y-M-01 00:00:00` wall clock in JST.
pub fn month_epoch_jst(year: i32, month: u32) -> Result<i64> {
    let midnight = JST
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .with_context(|| format!("no unique JST midnight for {:04}-{:02}", year, month))?;
    Ok(midnight.timestamp())
}

/// First and last calendar day of `Y-M`.
pub fn month_date_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let from = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {:04}-{:02}", year, month))?;
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let to = NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .and_then(|d| d.pred_opt())
        .with_context(|| format!("no last day for {:04}-{:02}", year, month))?;
    Ok((from, to))
}

fn month_label(year: i32, month: u32) -> String {
    format!("{:04}年{:02}月分", year, month)
}

/// Months from the configured floor up to the month of `now` inclusive,
/// newest first (the order the month picker showed them). `addressing` is
/// computed per month via the given constructor.
fn periods_desc<F>(
    now: DateTime<Tz>,
    floor_year: i32,
    floor_month: u32,
    mut addressing: F,
) -> Result<Vec<BillingPeriod>>
where
    F: FnMut(i32, u32) -> Result<PeriodAddressing>,
{
    if !(1..=12).contains(&floor_month) {
        bail!("invalid floor month {:04}-{:02}", floor_year, floor_month);
    }
    if (now.year(), now.month()) < (floor_year, floor_month) {
        bail!(
            "floor {:04}-{:02} lies after the current month {:04}-{:02}",
            floor_year,
            floor_month,
            now.year(),
            now.month()
        );
    }

    let mut periods = Vec::new();
    let (mut y, mut m) = (floor_year, floor_month);
    while (y, m) <= (now.year(), now.month()) {
        periods.push(BillingPeriod {
            label: month_label(y, m),
            year: y,
            month: m,
            addressing: addressing(y, m)?,
        });
        if m == 12 {
            y += 1;
            m = 1;
        } else {
            m += 1;
        }
    }
    periods.reverse();
    Ok(periods)
}

/// Selectable months for the revenue reports (epoch addressing).
pub fn revenue_periods(
    now: DateTime<Tz>,
    floor_year: i32,
    floor_month: u32,
) -> Result<Vec<BillingPeriod>> {
    periods_desc(now, floor_year, floor_month, |y, m| {
        Ok(PeriodAddressing::Epoch(month_epoch_jst(y, m)?))
    })
}

/// Selectable months for the KPI report (date-range addressing).
pub fn kpi_periods(
    now: DateTime<Tz>,
    floor_year: i32,
    floor_month: u32,
) -> Result<Vec<BillingPeriod>> {
    periods_desc(now, floor_year, floor_month, |y, m| {
        let (from, to) = month_date_range(y, m)?;
        Ok(PeriodAddressing::DateRange { from, to })
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
