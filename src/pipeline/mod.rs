//! Run orchestration: fetch → extract → shape → upload, one unit per
//! (report, month) pair.
//!
//! Units run strictly sequentially and fail independently: a partial run
//! (2 of 3 revenue reports delivered) is a normal outcome, reported per unit,
//! never a process failure. Nothing is retried; the operator re-triggers.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar;
use crate::config::AppConfig;
use crate::models::{
    BillingPeriod, LIVE_KPI, ReportSpec, UnitOutcome, UnitStatus,
};
use crate::scraper::{OrganizerScraper, ReportSource};
use crate::shaper;
use crate::transfer::{self, FtpUploader};

const PREVIEW_LINES: usize = 5;

pub struct Pipeline {
    config: AppConfig,
    source: Box<dyn ReportSource>,
    uploader: FtpUploader,
    no_upload: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RunStats {
    pub units: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
    pub stats: RunStats,
}

impl RunReport {
    fn from_outcomes(outcomes: Vec<UnitOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let stats = RunStats {
            units: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        };
        Self { outcomes, stats }
    }

    pub fn all_succeeded(&self) -> bool {
        self.stats.failed == 0
    }
}

impl Pipeline {
    pub fn new(config: AppConfig, no_upload: bool) -> Result<Self> {
        let source = OrganizerScraper::new(&config.showroom)?;
        let uploader = FtpUploader::new(config.ftp.clone());
        Ok(Self { config, source: Box::new(source), uploader, no_upload })
    }

    /// Test constructor with a stub source.
    pub fn with_source(config: AppConfig, source: Box<dyn ReportSource>, no_upload: bool) -> Self {
        let uploader = FtpUploader::new(config.ftp.clone());
        Self { config, source, uploader, no_upload }
    }

    // ── Revenue reports ───────────────────────────────────────────────────────

    /// Run the selected revenue reports for one month. Each report is one
    /// unit; an expired cookie on one does not stop the next.
    pub async fn run_revenue(
        &self,
        period: &BillingPeriod,
        reports: &[ReportSpec],
    ) -> RunReport {
        let mut outcomes = Vec::new();

        for spec in reports {
            let outcome = match self.revenue_unit(spec, period).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("{} {}: {:#}", spec.key, period.label, e);
                    UnitOutcome {
                        report: spec.key,
                        period: period.label.clone(),
                        status: UnitStatus::Failed { error: format!("{:#}", e) },
                        preview: None,
                    }
                }
            };
            outcomes.push(outcome);
        }

        RunReport::from_outcomes(outcomes)
    }

    async fn revenue_unit(&self, spec: &ReportSpec, period: &BillingPeriod) -> Result<UnitOutcome> {
        let rows = self.source.fetch_revenue_rows(spec, period).await?;

        let stamp = shaper::format_update_stamp(calendar::now_jst());
        let document = shaper::shape_revenue_csv(&rows, &stamp)?;
        let preview = shaper::preview(&document, PREVIEW_LINES);

        let status = if self.no_upload {
            UnitStatus::Shaped { rows: rows.len(), bytes: document.len() }
        } else {
            let remote =
                transfer::remote_path(&self.config.ftp.revenue_base_path, spec.output_filename);
            self.uploader.upload(document.clone(), &remote).await?;
            UnitStatus::Uploaded { remote_path: remote, rows: rows.len(), bytes: document.len() }
        };

        info!("{} {}: done", spec.key, period.label);
        Ok(UnitOutcome {
            report: spec.key,
            period: period.label.clone(),
            status,
            preview: Some(preview),
        })
    }

    // ── KPI report ────────────────────────────────────────────────────────────

    /// Run the KPI report for the given months, oldest first regardless of
    /// input order. One unit per month.
    pub async fn run_kpi(&self, periods: &[BillingPeriod]) -> RunReport {
        let mut ascending: Vec<&BillingPeriod> = periods.iter().collect();
        ascending.sort_by_key(|p| (p.year, p.month));

        let mut outcomes = Vec::new();
        for period in ascending {
            let outcome = match self.kpi_unit(period).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("live-kpi {}: {:#}", period.label, e);
                    UnitOutcome {
                        report: LIVE_KPI.key,
                        period: period.label.clone(),
                        status: UnitStatus::Failed { error: format!("{:#}", e) },
                        preview: None,
                    }
                }
            };
            outcomes.push(outcome);
        }

        RunReport::from_outcomes(outcomes)
    }

    async fn kpi_unit(&self, period: &BillingPeriod) -> Result<UnitOutcome> {
        let rows = self.source.fetch_kpi_rows(period).await?;

        let document = shaper::shape_kpi_csv(&rows)?;
        let preview = shaper::preview(&document, PREVIEW_LINES);

        let status = if self.no_upload {
            UnitStatus::Shaped { rows: rows.len(), bytes: document.len() }
        } else {
            let remote =
                transfer::remote_path(&self.config.ftp.kpi_base_path, &period.kpi_filename());
            self.uploader.upload(document.clone(), &remote).await?;
            UnitStatus::Uploaded { remote_path: remote, rows: rows.len(), bytes: document.len() }
        };

        info!("live-kpi {}: done", period.label);
        Ok(UnitOutcome {
            report: LIVE_KPI.key,
            period: period.label.clone(),
            status,
            preview: Some(preview),
        })
    }
}
