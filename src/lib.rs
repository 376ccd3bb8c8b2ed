//! SHOWROOM organizer report ETL.
//!
//! Fetches the monthly revenue and live-KPI reports from the authenticated
//! organizer pages, reshapes them into the fixed CSV layouts the billing
//! pipeline consumes, and delivers the files over FTP. Triggered manually,
//! one run per month selection; nothing persists between runs.

pub mod calendar;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scraper;
pub mod shaper;
pub mod transfer;
pub mod utils;
