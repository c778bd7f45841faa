//! Local `pg_restore` of the newest downloaded dump.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::db_config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::executor::LocalRunner;
use crate::local_files;
use crate::pgpass::PgPassFile;
use crate::settings::Settings;
use crate::utils::command::CommandLine;
use crate::utils::sort;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub dump_path: PathBuf,
    pub database: String,
    pub restored: bool,
    pub dump_deleted: bool,
    /// `pg_restore` exit code.
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Newest file in the local backup directory by version-aware name order.
pub fn latest_local_dump(settings: &Settings) -> Result<PathBuf> {
    let dir = settings.local_backup_dir();
    let names = local_files::list_files(&dir)?;
    let latest = sort::latest(&names)
        .ok_or_else(|| Error::backup_not_found(dir.display().to_string()))?;
    Ok(dir.join(latest))
}

pub fn restore_command(
    config: &DatabaseConfig,
    pgpass: &Path,
    database_name: &str,
    dump: &Path,
) -> CommandLine {
    CommandLine::new("pg_restore")
        .env("PGPASSFILE", pgpass.display().to_string())
        .arg("-c")
        .opt_arg("-U", config.effective_user())
        .arg("--no-owner")
        .arg("-h")
        .arg(&config.host)
        .arg("-p")
        .arg(config.port_or_default().to_string())
        .arg("-d")
        .arg(database_name)
        .arg(dump.display().to_string())
}

/// Restore the newest local dump into `database_name`.
///
/// A failing `pg_restore` does not abort: the result carries
/// `restored: false` and the failure text. The credentials file is removed
/// on every path out of this function.
pub fn import_latest_dump(
    runner: &dyn LocalRunner,
    settings: &Settings,
    config: &DatabaseConfig,
    database_name: &str,
) -> Result<ImportResult> {
    if database_name.trim().is_empty() {
        return Err(Error::validation_missing_argument(vec![
            "database-name".to_string(),
        ]));
    }

    let dump = latest_local_dump(settings)?;

    let pgpass = PgPassFile::create(
        &settings.pgpass_path(),
        config.effective_user().unwrap_or(""),
        config.password_or_empty(),
    )?;

    let cmd = restore_command(config, pgpass.path(), database_name, &dump);
    log_status!("import", "Restoring {} into {}", dump.display(), database_name);
    let output = runner.execute(&cmd);
    drop(pgpass);

    let warning = if output.success {
        log_status!("import", "Restored {} into {}", dump.display(), database_name);
        None
    } else {
        let message = format!(
            "Restore of {} into {} failed (exit {}): {}",
            dump.display(),
            database_name,
            output.exit_code,
            output.error_text()
        );
        log_warning!("import", "{}", message);
        Some(message)
    };

    let dump_deleted = if settings.keep_local_dumps == 0 {
        local_files::remove_if_exists(&dump)?
    } else {
        false
    };

    Ok(ImportResult {
        dump_path: dump,
        database: database_name.to_string(),
        restored: output.success,
        dump_deleted,
        exit_code: output.exit_code,
        warning,
    })
}
