use std::sync::LazyLock;

use regex::Regex;

// ── Cell transforms ───────────────────────────────────────────────────────────

/// Strip thousands separators (ASCII and full-width comma) and surrounding
/// whitespace. "1,234" → "1234"
pub fn strip_separators(s: &str) -> String {
    s.trim().replace([',', '，'], "")
}

/// Accept an invoice amount cell: separators stripped, the remainder must be
/// all ASCII digits. Subtotal and footer rows ("合計", blanks) fail here.
pub fn clean_amount(s: &str) -> Option<String> {
    let cleaned = strip_separators(s);
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

/// KPI count/point cells: separators stripped, value kept verbatim otherwise.
pub fn clean_count(s: &str) -> String {
    strip_separators(s)
}

/// "12.3%" → "12.3"
pub fn strip_percent(s: &str) -> String {
    s.trim().trim_end_matches('%').to_string()
}

// ── Combined start/duration cell ──────────────────────────────────────────────

static START_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\s*\((\d+)m(\d+)s\)$")
        .expect("valid start/duration regex")
});

/// Split the KPI "start datetime (duration)" cell, e.g.
/// `2025-09-03 21:00:12 (62m41s)` → ("2025-09-03 21:00:12", "63").
/// Whole minutes, rounded up when the trailing seconds reach 30. A cell that does
/// not match yields an empty start and zero minutes.
pub fn split_start_duration(s: &str) -> (String, String) {
    let Some(caps) = START_DURATION_RE.captures(s.trim()) else {
        return (String::new(), "0".to_string());
    };
    let minutes: u64 = caps[2].parse().unwrap_or(0);
    let seconds: u64 = caps[3].parse().unwrap_or(0);
    let rounded = minutes + u64::from(seconds >= 30);
    (caps[1].to_string(), rounded.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
