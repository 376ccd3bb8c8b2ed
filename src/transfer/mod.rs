//! FTP delivery of the generated CSVs.
//!
//! One blocking connect → login → binary STOR → close sequence per file, no
//! connection reuse. The blocking stream runs on the blocking thread pool so
//! the async pipeline is not stalled.

use std::io::Cursor;

use anyhow::{Context, Result};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::info;

use crate::config::FtpConfig;

/// Normalize a configured base path to directory form. Older deployments
/// configured the revenue target as the full CSV file path; the file name is
/// dropped here so joining stays correct either way.
pub fn normalize_base_dir(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last.ends_with(".csv") {
        match trimmed.rfind('/') {
            Some(i) => trimmed[..i].to_string(),
            None => String::new(),
        }
    } else {
        trimmed.to_string()
    }
}

/// `<base dir>/<filename>` with the base normalized first.
pub fn remote_path(base: &str, filename: &str) -> String {
    let dir = normalize_base_dir(base);
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir, filename)
    }
}

pub struct FtpUploader {
    config: FtpConfig,
}

impl FtpUploader {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    /// STOR `payload` at `remote` on the configured server, overwriting any
    /// previous upload of the same file.
    pub async fn upload(&self, payload: Vec<u8>, remote: &str) -> Result<()> {
        let config = self.config.clone();
        let target = remote.to_string();
        let bytes = payload.len();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let addr = if config.host.contains(':') {
                config.host.clone()
            } else {
                format!("{}:21", config.host)
            };

            let mut ftp = FtpStream::connect(&addr)
                .with_context(|| format!("FTP connect to {}", addr))?;
            ftp.login(&config.user, &config.password).context("FTP login")?;
            ftp.transfer_type(FileType::Binary).context("FTP binary mode")?;
            ftp.put_file(&target, &mut Cursor::new(payload))
                .with_context(|| format!("FTP STOR {}", target))?;
            ftp.quit().ok();
            Ok(())
        })
        .await
        .context("FTP upload task")??;

        info!("uploaded {} bytes to {}", bytes, remote);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
