//! Local dump retention.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::local_files;
use crate::settings::Settings;
use crate::utils::sort;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub directory: PathBuf,
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
}

/// Keep the `keep_local_dumps` newest files in the local backup directory
/// and delete the rest. A limit of 0 keeps everything.
pub fn cleanup_old_dumps(settings: &Settings) -> Result<CleanupResult> {
    let directory = settings.local_backup_dir();
    let mut names = local_files::list_files(&directory)?;
    sort::version_sort(&mut names);

    let keep = settings.keep_local_dumps as usize;
    if keep == 0 || names.len() <= keep {
        return Ok(CleanupResult {
            directory,
            kept: names,
            deleted: Vec::new(),
        });
    }

    let kept = names.split_off(names.len() - keep);
    let mut deleted = Vec::with_capacity(names.len());
    for name in names {
        if local_files::remove_if_exists(&directory.join(&name))? {
            log_status!("cleanup", "Deleted {}", name);
            deleted.push(name);
        }
    }

    Ok(CleanupResult {
        directory,
        kept,
        deleted,
    })
}
