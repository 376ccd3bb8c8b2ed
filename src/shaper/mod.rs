//! Assembly of the downstream CSV layouts.
//!
//! The revenue layout is a fixed contract with the billing loader: three
//! columns, no header, and the run timestamp present only in the first row's
//! third column. The KPI layout is a plain headered table.

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use csv::Writer;

use crate::models::{KpiRow, RevenueRow};

/// Third-column run timestamp, e.g. "2025/10/01 09:30" (JST wall clock).
pub fn format_update_stamp(at: DateTime<Tz>) -> String {
    at.format("%Y/%m/%d %H:%M").to_string()
}

/// Revenue CSV: `amount,account,update-stamp` with the stamp only on row 0.
/// Callers pass a pre-formatted stamp so re-shaping the same extraction is
/// byte-identical.
pub fn shape_revenue_csv(rows: &[RevenueRow], update_stamp: &str) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());

    for (i, row) in rows.iter().enumerate() {
        let stamp = if i == 0 { update_stamp } else { "" };
        writer
            .write_record([row.amount.as_str(), row.account.as_str(), stamp])
            .context("revenue CSV row")?;
    }

    writer.into_inner().context("revenue CSV buffer")
}

/// KPI CSV: header row with the 27 field names, then one row per
/// deduplicated grid row.
pub fn shape_kpi_csv(rows: &[KpiRow]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());

    writer.write_record(KpiRow::FIELD_NAMES).context("KPI CSV header")?;
    for row in rows {
        writer.write_record(row.values()).context("KPI CSV row")?;
    }

    writer.into_inner().context("KPI CSV buffer")
}

/// First lines of a generated document, shown to the operator after a run.
pub fn preview(document: &[u8], max_lines: usize) -> String {
    String::from_utf8_lossy(document)
        .lines()
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
