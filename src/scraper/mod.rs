pub mod cleaner;
pub mod extract;
pub mod http_client;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::config::ShowroomConfig;
use crate::models::{BillingPeriod, KpiRow, PeriodAddressing, ReportShape, ReportSpec, RevenueRow};

use self::http_client::HttpClient;

/// The KPI grid serves at most this many pages per range.
pub const KPI_MAX_PAGES: u32 = 5;
/// A page with fewer accepted rows than this is the last one.
pub const KPI_FULL_PAGE_ROWS: usize = 1000;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable report source abstraction.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_revenue_rows(
        &self,
        spec: &ReportSpec,
        period: &BillingPeriod,
    ) -> Result<Vec<RevenueRow>>;

    async fn fetch_kpi_rows(&self, period: &BillingPeriod) -> Result<Vec<KpiRow>>;
}

// ── Organizer page scraper ────────────────────────────────────────────────────

pub struct OrganizerScraper {
    client: HttpClient,
    base_url: String,
    cookie: reqwest::header::HeaderValue,
    kpi_cookie: reqwest::header::HeaderValue,
}

impl OrganizerScraper {
    pub fn new(config: &ShowroomConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(
                &config.user_agent,
                config.timeout_secs,
                &config.login_markers,
            )?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie: http_client::cookie_header_value(&config.auth_cookie_string)?,
            kpi_cookie: http_client::cookie_header_value(config.kpi_cookie())?,
        })
    }

    /// Revenue report URL: `<base>/<path>?from=<epoch>`.
    fn revenue_url(&self, spec: &ReportSpec, epoch: i64) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, spec.path))
            .with_context(|| format!("invalid report URL for {}", spec.key))?;
        url.query_pairs_mut().append_pair("from", &epoch.to_string());
        Ok(url)
    }

    /// KPI page URL: `<base>/<path>?from_date=…&to_date=…&page=<n>&room_id=`.
    fn kpi_url(&self, period: &BillingPeriod, page: u32) -> Result<Url> {
        let PeriodAddressing::DateRange { from, to } = period.addressing else {
            bail!("KPI report requires date-range addressing, got {}", period.label);
        };
        let mut url = Url::parse(&format!("{}/{}", self.base_url, crate::models::LIVE_KPI.path))
            .context("invalid KPI URL")?;
        url.query_pairs_mut()
            .append_pair("from_date", &from.format("%Y-%m-%d").to_string())
            .append_pair("to_date", &to.format("%Y-%m-%d").to_string())
            .append_pair("page", &page.to_string())
            .append_pair("room_id", "");
        Ok(url)
    }
}

#[async_trait]
impl ReportSource for OrganizerScraper {
    async fn fetch_revenue_rows(
        &self,
        spec: &ReportSpec,
        period: &BillingPeriod,
    ) -> Result<Vec<RevenueRow>> {
        let PeriodAddressing::Epoch(epoch) = period.addressing else {
            bail!("{} requires epoch addressing, got {}", spec.key, period.label);
        };

        let url = self.revenue_url(spec, epoch)?;
        info!("{}: fetching {} (from={})", spec.key, period.label, epoch);

        let body = self
            .client
            .get_report_page(&url, &self.cookie)
            .await
            .with_context(|| format!("{} {}", spec.key, period.label))?;

        let rows = {
            let doc = Html::parse_document(&body);
            match spec.shape {
                ReportShape::Standard => extract::extract_standard(&doc),
                ReportShape::TotalPlusRows => extract::extract_total_plus_rows(&doc),
                ReportShape::KpiPaginated => bail!("{} is not an invoice report", spec.key),
            }
        };

        info!("{}: {} rows extracted", spec.key, rows.len());
        Ok(rows)
    }

    /// Walk the paginated KPI grid for one month. Pages are fetched strictly
    /// in order: each stop condition depends on the previous page's rows.
    async fn fetch_kpi_rows(&self, period: &BillingPeriod) -> Result<Vec<KpiRow>> {
        let mut all_rows: Vec<KpiRow> = Vec::new();

        for page in 1..=KPI_MAX_PAGES {
            let url = self.kpi_url(period, page)?;
            info!("live-kpi: fetching {} page {}", period.label, page);

            let body = self
                .client
                .get_report_page(&url, &self.kpi_cookie)
                .await
                .with_context(|| format!("live-kpi {} page {}", period.label, page))?;

            let page_rows = {
                let doc = Html::parse_document(&body);
                extract::extract_kpi_page(&doc)
            };

            match page_rows {
                None => {
                    debug!("page {}: no table, stopping", page);
                    break;
                }
                Some(rows) if rows.is_empty() => {
                    debug!("page {}: header only, stopping", page);
                    break;
                }
                Some(rows) => {
                    let accepted = rows.len();
                    all_rows.extend(rows);
                    if accepted < KPI_FULL_PAGE_ROWS {
                        debug!("page {}: {} rows (last page)", page, accepted);
                        break;
                    }
                }
            }
        }

        let (rows, removed) = extract::dedupe_kpi_rows(all_rows);
        if removed > 0 {
            info!("live-kpi: {} duplicate rows removed across pages", removed);
        }
        info!("live-kpi: {} rows for {}", rows.len(), period.label);
        Ok(rows)
    }
}
