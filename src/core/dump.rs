//! Remote `pg_dump` invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db_config::DatabaseConfig;
use crate::error::Result;
use crate::executor::RemoteHost;
use crate::settings::{dump_file_name, Settings};
use crate::utils::command::CommandLine;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpResult {
    pub host: String,
    pub path: String,
    pub database: String,
    /// Command as run, with the password masked.
    pub command: String,
}

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Where the dump will be written: the configured override, else a
/// timestamped file in the remote backup directory.
pub fn dump_path(settings: &Settings, now: DateTime<Utc>) -> Result<String> {
    if let Some(path) = settings.remote_dump_path.as_deref().filter(|p| !p.is_empty()) {
        return Ok(path.to_string());
    }
    Ok(format!(
        "{}/{}",
        settings.remote_backup_dir()?,
        dump_file_name(&timestamp(now))
    ))
}

pub fn dump_command(
    settings: &Settings,
    config: &DatabaseConfig,
    path: &str,
    database: &str,
) -> CommandLine {
    let mut cmd = CommandLine::new("pg_dump");
    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        cmd = cmd.env("PGPASSWORD", password);
    }
    let port = config.port.map(|p| p.to_string());
    cmd.opt_arg("-U", config.effective_user())
        .arg("-h")
        .arg(&config.host)
        .opt_arg("-p", port.as_deref())
        .arg("-Z")
        .arg(settings.compression_level.to_string())
        .arg("-Fc")
        .arg(format!("--file={}", path))
        .arg(database)
}

/// Dump the remote database into the remote backup directory.
pub fn create_dump(
    host: &dyn RemoteHost,
    settings: &Settings,
    config: &DatabaseConfig,
) -> Result<DumpResult> {
    create_dump_at(host, settings, config, Utc::now())
}

pub fn create_dump_at(
    host: &dyn RemoteHost,
    settings: &Settings,
    config: &DatabaseConfig,
    now: DateTime<Utc>,
) -> Result<DumpResult> {
    let database = config.require_database("remote")?.to_string();
    let backup_dir = settings.remote_backup_dir()?;
    let path = dump_path(settings, now)?;

    host.run(&CommandLine::new("mkdir").arg("-p").arg(&backup_dir))?;

    let cmd = dump_command(settings, config, &path, &database);
    log_status!("dump", "Dumping {} on {} to {}", database, host.label(), path);
    host.run(&cmd)?;

    Ok(DumpResult {
        host: host.label().to_string(),
        path,
        database,
        command: cmd.display_redacted(),
    })
}
