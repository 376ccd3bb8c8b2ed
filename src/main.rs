use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use showroom_etl::calendar;
use showroom_etl::config::AppConfig;
use showroom_etl::models::{
    BillingPeriod, PeriodAddressing, REVENUE_REPORTS, ReportSpec, UnitStatus,
    revenue_report_by_key,
};
use showroom_etl::pipeline::{Pipeline, RunReport};
use showroom_etl::utils;

#[derive(Parser)]
#[command(name = "showroom-etl", about = "SHOWROOM organizer report ETL", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Shape and preview the CSVs without uploading
    #[arg(long, global = true)]
    no_upload: bool,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the selectable billing months (newest first)
    Months,

    /// Fetch, shape and upload the monthly revenue reports
    Revenue {
        /// Target month, e.g. 2025-10
        #[arg(short, long)]
        month: String,

        /// Report keys to run (default: all of time-charge, premium-live, room-sales)
        #[arg(short, long, value_delimiter = ',')]
        report: Vec<String>,
    },

    /// Fetch, shape and upload the monthly live-KPI export
    Kpi {
        /// Target months, e.g. 2025-09,2025-10 (processed oldest first)
        #[arg(short, long, value_delimiter = ',', required = true)]
        month: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "showroom_etl=info,warn",
        1 => "showroom_etl=debug,info",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let floor = (config.showroom.floor_year, config.showroom.floor_month);
    let now = calendar::now_jst();

    match cli.command {
        Command::Months => {
            let periods = calendar::revenue_periods(now, floor.0, floor.1)?;
            println!("─────────────────────────────────");
            println!("  selectable billing months");
            println!("─────────────────────────────────");
            for p in &periods {
                let PeriodAddressing::Epoch(epoch) = p.addressing else { continue };
                println!("  {}  ({})  from={}", p.label, p.month_key(), epoch);
            }
            println!("─────────────────────────────────");
        }

        Command::Revenue { month, report } => {
            let _t = utils::Timer::start("revenue run");

            let periods = calendar::revenue_periods(now, floor.0, floor.1)?;
            let period = find_period(&periods, &month)?;
            let reports = resolve_reports(&report)?;

            let pipeline = Pipeline::new(config, cli.no_upload)?;
            let run = pipeline.run_revenue(period, &reports).await;
            print_report(&run, cli.json)?;
            if !run.all_succeeded() {
                bail!("{} of {} units failed", run.stats.failed, run.stats.units);
            }
        }

        Command::Kpi { month } => {
            let _t = utils::Timer::start("KPI run");

            let periods = calendar::kpi_periods(now, floor.0, floor.1)?;
            let selected: Vec<BillingPeriod> = month
                .iter()
                .map(|m| find_period(&periods, m).map(Clone::clone))
                .collect::<Result<_>>()?;

            let pipeline = Pipeline::new(config, cli.no_upload)?;
            let run = pipeline.run_kpi(&selected).await;
            print_report(&run, cli.json)?;
            if !run.all_succeeded() {
                bail!("{} of {} units failed", run.stats.failed, run.stats.units);
            }
        }
    }

    Ok(())
}

/// Resolve "YYYY-MM" against the selectable months; anything outside the
/// floor..now window is rejected rather than silently fetched.
fn find_period<'a>(periods: &'a [BillingPeriod], month: &str) -> Result<&'a BillingPeriod> {
    periods
        .iter()
        .find(|p| p.month_key() == month.trim())
        .with_context(|| format!("month {} is not selectable (run `showroom-etl months`)", month))
}

fn resolve_reports(keys: &[String]) -> Result<Vec<ReportSpec>> {
    if keys.is_empty() {
        return Ok(REVENUE_REPORTS.to_vec());
    }
    keys.iter()
        .map(|k| {
            revenue_report_by_key(k.trim())
                .with_context(|| format!("unknown revenue report key: {}", k))
        })
        .collect()
}

fn print_report(run: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }

    for outcome in &run.outcomes {
        match &outcome.status {
            UnitStatus::Uploaded { remote_path, rows, bytes } => {
                println!(
                    "OK    {} {} — {} rows, {} bytes → {}",
                    outcome.report,
                    outcome.period,
                    utils::fmt_number(*rows),
                    utils::fmt_number(*bytes),
                    remote_path
                );
            }
            UnitStatus::Shaped { rows, bytes } => {
                println!(
                    "DRY   {} {} — {} rows, {} bytes (not uploaded)",
                    outcome.report,
                    outcome.period,
                    utils::fmt_number(*rows),
                    utils::fmt_number(*bytes)
                );
            }
            UnitStatus::Failed { error } => {
                println!("FAIL  {} {} — {}", outcome.report, outcome.period, error);
            }
        }
        if let Some(preview) = &outcome.preview {
            for line in preview.lines() {
                println!("      | {}", line);
            }
        }
    }

    println!(
        "done: {} units, {} ok, {} failed",
        run.stats.units, run.stats.succeeded, run.stats.failed
    );
    Ok(())
}
