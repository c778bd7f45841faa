//! Pull the newest remote dump into the local backup directory.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Error, Result, TransferFailedDetails};
use crate::executor::RemoteHost;
use crate::local_files;
use crate::settings::Settings;
use crate::utils::command::CommandLine;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub host: String,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub remote_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Resolve which remote file to fetch: `explicit`, else the configured
/// `remote_dump_path`, else the last entry of `ls -v` in the backup dir.
pub fn resolve_remote_path(
    host: &dyn RemoteHost,
    settings: &Settings,
    explicit: Option<&str>,
) -> Result<String> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(path.to_string());
    }
    if let Some(path) = settings.remote_dump_path.as_deref().filter(|p| !p.is_empty()) {
        return Ok(path.to_string());
    }

    let backup_dir = settings.remote_backup_dir()?;
    let listing = host.capture(&CommandLine::new("ls").arg("-v").arg(&backup_dir))?;
    let latest = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .ok_or_else(|| Error::backup_not_found(backup_dir.clone()))?;

    Ok(format!("{}/{}", backup_dir, latest))
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Download the newest remote dump, then delete the remote copy.
///
/// The delete is attempted whenever the remote path resolved, including
/// after a failed transfer; its failure only produces a warning.
pub fn download_latest_dump(
    host: &dyn RemoteHost,
    settings: &Settings,
    explicit: Option<&str>,
) -> Result<FetchResult> {
    let remote_path = resolve_remote_path(host, settings, explicit)?;

    let local_dir = settings.local_backup_dir();
    local_files::ensure_dir(&local_dir)?;
    let local_path = local_dir.join(basename(&remote_path));

    log_status!(
        "fetch",
        "Downloading {}:{} to {}",
        host.label(),
        remote_path,
        local_path.display()
    );
    let transfer = host.download(&remote_path, &local_path);

    let delete = host.execute(&CommandLine::new("rm").arg(&remote_path));
    let warning = if delete.success {
        None
    } else {
        let message = format!(
            "Could not delete remote dump {} on {}: {}",
            remote_path,
            host.label(),
            delete.error_text()
        );
        log_warning!("fetch", "{}", message);
        Some(message)
    };

    if !transfer.success {
        return Err(Error::transfer_failed(TransferFailedDetails {
            source: format!("{}:{}", host.label(), remote_path),
            destination: local_path.display().to_string(),
            exit_code: transfer.exit_code,
            stderr: transfer.error_text(),
        }));
    }

    Ok(FetchResult {
        host: host.label().to_string(),
        remote_path,
        local_path,
        remote_deleted: delete.success,
        warning,
    })
}
