use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub showroom: ShowroomConfig,
    pub ftp: FtpConfig,
}

/// Organizer page access. `auth_cookie_string` has no default: startup fails
/// without it, before any unit runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShowroomConfig {
    /// Raw browser cookie string copied from a logged-in organizer session.
    pub auth_cookie_string: String,

    /// Separate cookie for the KPI pages; falls back to the shared one.
    #[serde(default)]
    pub kpi_cookie_string: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Substrings that identify the login page served in place of a report.
    #[serde(default = "default_login_markers")]
    pub login_markers: Vec<String>,

    /// Earliest selectable billing month.
    #[serde(default = "default_floor_year")]
    pub floor_year: i32,

    #[serde(default = "default_floor_month")]
    pub floor_month: u32,
}

/// Upload target. All fields required; the credentials are plaintext FTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,

    /// Directory for the revenue CSVs. Tolerated in historical full-file-path
    /// form; normalized in `transfer`.
    pub revenue_base_path: String,

    /// Directory for the monthly KPI CSVs.
    pub kpi_base_path: String,
}

impl ShowroomConfig {
    pub fn kpi_cookie(&self) -> &str {
        self.kpi_cookie_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.auth_cookie_string)
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.showroom-live.com/organizer".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    // The organizer pages reject unknown agents; a plain desktop Chrome works.
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/100.0.4896.127 Safari/537.36"
        .to_string()
}
fn default_login_markers() -> Vec<String> {
    ["ログイン", "会員登録", "アカウントにログイン"]
        .map(String::from)
        .to_vec()
}
fn default_floor_year() -> i32 {
    2024
}
fn default_floor_month() -> u32 {
    1
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides. Missing required
    /// values (cookie, FTP credentials, base paths) are a startup error.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SHOWROOM").separator("__"))
            .build()?;

        cfg.try_deserialize()
            .context("incomplete configuration: check the [showroom] and [ftp] sections")
    }
}
