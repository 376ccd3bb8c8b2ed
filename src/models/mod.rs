use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Billing period ────────────────────────────────────────────────────────────

/// How a month is addressed in the remote report URL. Revenue reports take the
/// epoch second of the month's first midnight (JST); the KPI report takes an
/// explicit calendar-day range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeriodAddressing {
    Epoch(i64),
    DateRange { from: NaiveDate, to: NaiveDate },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingPeriod {
    /// Operator-facing label, e.g. "2025年10月分".
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub addressing: PeriodAddressing,
}

impl BillingPeriod {
    /// "YYYY-MM", used for CLI input matching and KPI filenames.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Upload filename for the monthly KPI export.
    pub fn kpi_filename(&self) -> String {
        format!("{}_all_all.csv", self.month_key())
    }
}

// ── Report catalogue ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportShape {
    /// Fixed 5-column invoice rows (time-charge, premium-live).
    Standard,
    /// Invoice rows preceded by a scalar organizer total (room-sales).
    TotalPlusRows,
    /// Paginated 28-column KPI grid.
    KpiPaginated,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReportSpec {
    pub key: &'static str,
    pub display_label: &'static str,
    /// Path under the organizer base URL.
    pub path: &'static str,
    /// Fixed upload filename. Empty for KPI, whose filename is per-month.
    pub output_filename: &'static str,
    pub shape: ReportShape,
}

pub const TIME_CHARGE: ReportSpec = ReportSpec {
    key: "time-charge",
    display_label: "タイムチャージ",
    path: "show_rank_time_charge_hist_invoice_format",
    output_filename: "show_rank_time_charge_hist_invoice_format.csv",
    shape: ReportShape::Standard,
};

pub const PREMIUM_LIVE: ReportSpec = ReportSpec {
    key: "premium-live",
    display_label: "プレミアムライブ",
    path: "premium_live_hist_invoice_format",
    output_filename: "premium_live_hist_invoice_format.csv",
    shape: ReportShape::Standard,
};

pub const ROOM_SALES: ReportSpec = ReportSpec {
    key: "room-sales",
    display_label: "ルーム売上",
    path: "room_sales_hist_invoice_format",
    output_filename: "room_sales_hist_invoice_format.csv",
    shape: ReportShape::TotalPlusRows,
};

pub const LIVE_KPI: ReportSpec = ReportSpec {
    key: "live-kpi",
    display_label: "配信KPI",
    path: "live_kpi",
    output_filename: "",
    shape: ReportShape::KpiPaginated,
};

/// The monthly revenue reports, in the order the operator tool listed them.
pub const REVENUE_REPORTS: [ReportSpec; 3] = [TIME_CHARGE, PREMIUM_LIVE, ROOM_SALES];

pub fn revenue_report_by_key(key: &str) -> Option<ReportSpec> {
    REVENUE_REPORTS.iter().copied().find(|r| r.key == key)
}

// ── Extracted rows ────────────────────────────────────────────────────────────

/// One accepted invoice row: distribution amount (digit string, separators
/// already stripped) and the payee account id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueRow {
    pub amount: String,
    pub account: String,
}

impl RevenueRow {
    pub fn new(amount: impl Into<String>, account: impl Into<String>) -> Self {
        Self { amount: amount.into(), account: account.into() }
    }

    /// Placeholder emitted when a month has no qualifying rows; the billing
    /// side rejects empty files.
    pub fn sentinel() -> Self {
        Self::new("0", "dummy")
    }
}

/// One deduplicated KPI grid row. Numeric fields hold digit strings with
/// thousands separators removed; the follow rate has its `%` removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KpiRow {
    pub account_id: String,
    pub room_id: String,
    pub room_name: String,
    pub started_at: String,
    pub duration_minutes: String,
    pub viewers: String,
    pub unique_viewers: String,
    pub peak_concurrent: String,
    pub comment_count: String,
    pub comment_users: String,
    pub follower_start: String,
    pub follower_end: String,
    pub follower_delta: String,
    pub first_time_viewers: String,
    pub returning_viewers: String,
    pub gift_count: String,
    pub gift_users: String,
    pub gift_point: String,
    pub paid_gift_point: String,
    pub free_gift_point: String,
    pub star_count: String,
    pub seed_count: String,
    pub avg_view_minutes: String,
    pub follow_rate: String,
    pub new_fans: String,
    pub fan_level_up_users: String,
    pub premium_viewers: String,
}

impl KpiRow {
    /// CSV header, fixed order. The downstream loader matches by position.
    pub const FIELD_NAMES: [&'static str; 27] = [
        "アカウントID",
        "ルームID",
        "ルーム名",
        "配信開始日時",
        "配信時間(分)",
        "視聴者数",
        "ユニーク視聴者数",
        "最大同時視聴者数",
        "コメント数",
        "コメント人数",
        "配信開始時フォロワー数",
        "配信終了時フォロワー数",
        "フォロワー増減",
        "初見視聴者数",
        "リピート視聴者数",
        "ギフト数",
        "ギフト人数",
        "ギフトポイント",
        "有料ギフトポイント",
        "無料ギフトポイント",
        "星の数",
        "種の数",
        "平均視聴時間(分)",
        "フォロー率",
        "新規ファン数",
        "ファンレベルアップ人数",
        "プレミアム視聴者数",
    ];

    /// Field values in header order.
    pub fn values(&self) -> [&str; 27] {
        [
            &self.account_id,
            &self.room_id,
            &self.room_name,
            &self.started_at,
            &self.duration_minutes,
            &self.viewers,
            &self.unique_viewers,
            &self.peak_concurrent,
            &self.comment_count,
            &self.comment_users,
            &self.follower_start,
            &self.follower_end,
            &self.follower_delta,
            &self.first_time_viewers,
            &self.returning_viewers,
            &self.gift_count,
            &self.gift_users,
            &self.gift_point,
            &self.paid_gift_point,
            &self.free_gift_point,
            &self.star_count,
            &self.seed_count,
            &self.avg_view_minutes,
            &self.follow_rate,
            &self.new_fans,
            &self.fan_level_up_users,
            &self.premium_viewers,
        ]
    }

    /// Key for cross-page deduplication: the same broadcast can straddle two
    /// result pages when rows shift between requests.
    pub fn dedupe_key(&self) -> (String, String, String, String) {
        (
            self.account_id.clone(),
            self.room_id.clone(),
            self.started_at.clone(),
            self.duration_minutes.clone(),
        )
    }
}

// ── Run outcomes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Uploaded { remote_path: String, rows: usize, bytes: usize },
    /// Shaped but not uploaded (dry run).
    Shaped { rows: usize, bytes: usize },
    Failed { error: String },
}

/// Result of one (report, month) unit. Failures are captured here, never
/// propagated past the orchestrator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnitOutcome {
    pub report: &'static str,
    pub period: String,
    #[serde(flatten)]
    pub status: UnitStatus,
    /// First lines of the generated document, for the operator to eyeball.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, UnitStatus::Failed { .. })
    }
}
