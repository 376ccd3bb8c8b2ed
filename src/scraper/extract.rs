//! Table location and row extraction for the organizer report pages.
//!
//! The markup contracts here are ad hoc: class names, cell positions and cell
//! counts are whatever the organizer pages currently ship. Everything brittle
//! funnels through `locate_table` / `cells_of`, so a layout change stays out
//! of the shaping and upload code.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{KpiRow, RevenueRow};
use crate::scraper::cleaner;

// ── Selectors ─────────────────────────────────────────────────────────────────

static INVOICE_TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.invoice-format").expect("valid invoice selector"));
static ANY_TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid tr selector"));
static TD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid td selector"));
static A_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid a selector"));
static ROOM_NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".room-name").expect("valid room-name selector"));

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // お支払金額（税抜）：12,345円 — the organizer total above the room table.
    Regex::new(r"お支払金額（税抜）[：:]\s*([\d,，]+)\s*円").expect("valid total regex")
});

// ── Markup access ─────────────────────────────────────────────────────────────

/// The single results table of a report page: the invoice-format class when
/// present, else the first table in the document.
pub fn locate_table(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&INVOICE_TABLE_SELECTOR)
        .next()
        .or_else(|| doc.select(&ANY_TABLE_SELECTOR).next())
}

/// Data cells of a row. Header rows carry `th` cells only and come back empty.
pub fn cells_of(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&TD_SELECTOR).collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Text of the first nested link, else the cell's own text. Identifier cells
/// wrap the value in an anchor on some page revisions.
fn linked_text(cell: ElementRef<'_>) -> String {
    cell.select(&A_SELECTOR)
        .next()
        .map(cell_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| cell_text(cell))
}

// ── Invoice shapes (time-charge, premium-live, room-sales) ────────────────────

/// Shared row walk for the invoice tables: at least 5 cells, distribution
/// amount in cell 3, account id in cell 4. The digit gate on the amount drops
/// the header, subtotal and footer rows.
fn walk_invoice_rows(table: ElementRef<'_>) -> Vec<RevenueRow> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for tr in table.select(&TR_SELECTOR) {
        let cells = cells_of(tr);
        if cells.len() < 5 {
            continue;
        }
        let Some(amount) = cleaner::clean_amount(&cell_text(cells[3])) else {
            skipped += 1;
            continue;
        };
        rows.push(RevenueRow::new(amount, cell_text(cells[4])));
    }

    if skipped > 0 {
        debug!("{} non-numeric invoice rows skipped", skipped);
    }
    rows
}

/// Time-charge / premium-live extraction. A month without qualifying rows
/// still yields one sentinel row so the uploaded file is never empty.
pub fn extract_standard(doc: &Html) -> Vec<RevenueRow> {
    let rows = match locate_table(doc) {
        Some(table) => walk_invoice_rows(table),
        None => {
            warn!("no results table in the page, emitting sentinel row");
            Vec::new()
        }
    };

    if rows.is_empty() {
        return vec![RevenueRow::sentinel()];
    }
    rows
}

/// The organizer total above the room-sales table, separators stripped.
/// Missing summary or a pattern miss both read as "0".
pub fn extract_total(doc: &Html) -> String {
    let text: String = doc.root_element().text().collect();
    TOTAL_RE
        .captures(&text)
        .map(|caps| cleaner::strip_separators(&caps[1]))
        .unwrap_or_else(|| "0".to_string())
}

/// Room-sales extraction: the organizer total as a synthetic first row, then
/// the per-room rows. The synthetic row already guarantees a non-empty file,
/// so zero room rows need no sentinel.
pub fn extract_total_plus_rows(doc: &Html) -> Vec<RevenueRow> {
    let mut rows = vec![RevenueRow::new(extract_total(doc), "MKsoul")];
    if let Some(table) = locate_table(doc) {
        rows.extend(walk_invoice_rows(table));
    } else {
        warn!("no room table in the page, keeping only the total row");
    }
    rows
}

// ── KPI shape ─────────────────────────────────────────────────────────────────

/// Rows of one KPI result page. `None` means the page carries no table at all
/// (end of results); an empty vector means a header-only table. Rows with a
/// cell count other than 28 are silently skipped.
pub fn extract_kpi_page(doc: &Html) -> Option<Vec<KpiRow>> {
    let table = locate_table(doc)?;

    let mut rows = Vec::new();
    for tr in table.select(&TR_SELECTOR) {
        let cells = cells_of(tr);
        if cells.is_empty() {
            continue; // header
        }
        if cells.len() != 28 {
            debug!("KPI row with {} cells skipped", cells.len());
            continue;
        }
        rows.push(kpi_row_from_cells(&cells));
    }
    Some(rows)
}

/// Map the 28 raw cells onto the 27 output fields. Cell 0 is the grid row
/// number and cell 27 the detail link; neither survives. Cell 4 splits into
/// start datetime + whole minutes.
fn kpi_row_from_cells(cells: &[ElementRef<'_>]) -> KpiRow {
    let (started_at, duration_minutes) = cleaner::split_start_duration(&cell_text(cells[4]));

    let room_name = cells[3]
        .select(&ROOM_NAME_SELECTOR)
        .next()
        .map(cell_text)
        .unwrap_or_else(|| cell_text(cells[3]));

    KpiRow {
        account_id: linked_text(cells[1]),
        room_id: linked_text(cells[2]),
        room_name,
        started_at,
        duration_minutes,
        viewers: cleaner::clean_count(&cell_text(cells[5])),
        unique_viewers: cleaner::clean_count(&cell_text(cells[6])),
        peak_concurrent: cleaner::clean_count(&cell_text(cells[7])),
        comment_count: cleaner::clean_count(&cell_text(cells[8])),
        comment_users: cleaner::clean_count(&cell_text(cells[9])),
        follower_start: cleaner::clean_count(&cell_text(cells[10])),
        follower_end: cleaner::clean_count(&cell_text(cells[11])),
        follower_delta: cleaner::clean_count(&cell_text(cells[12])),
        first_time_viewers: cleaner::clean_count(&cell_text(cells[13])),
        returning_viewers: cleaner::clean_count(&cell_text(cells[14])),
        gift_count: cleaner::clean_count(&cell_text(cells[15])),
        gift_users: cleaner::clean_count(&cell_text(cells[16])),
        gift_point: cleaner::clean_count(&cell_text(cells[17])),
        paid_gift_point: cleaner::clean_count(&cell_text(cells[18])),
        free_gift_point: cleaner::clean_count(&cell_text(cells[19])),
        star_count: cleaner::clean_count(&cell_text(cells[20])),
        seed_count: cleaner::clean_count(&cell_text(cells[21])),
        avg_view_minutes: cleaner::clean_count(&cell_text(cells[22])),
        follow_rate: cleaner::strip_percent(&cell_text(cells[23])),
        new_fans: cleaner::clean_count(&cell_text(cells[24])),
        fan_level_up_users: cleaner::clean_count(&cell_text(cells[25])),
        premium_viewers: cleaner::clean_count(&cell_text(cells[26])),
    }
}

/// Drop repeats of `(account, room, start, duration)` across pages, keeping
/// the first occurrence. Returns the surviving rows and the removed count.
pub fn dedupe_kpi_rows(rows: Vec<KpiRow>) -> (Vec<KpiRow>, usize) {
    let before = rows.len();
    let mut seen = HashSet::new();
    let deduped: Vec<KpiRow> = rows.into_iter().filter(|r| seen.insert(r.dedupe_key())).collect();
    let removed = before - deduped.len();
    (deduped, removed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
