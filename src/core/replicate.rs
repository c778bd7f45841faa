//! End-to-end workflow: dump on every database host, download, restore
//! locally, prune old dumps.

use serde::Serialize;

use crate::db_config::ConfigResolver;
use crate::dump::{self, DumpResult};
use crate::error::Result;
use crate::executor::{LocalRunner, RemoteHost};
use crate::fetch::{self, FetchResult};
use crate::import::{self, ImportResult};
use crate::retention::{self, CleanupResult};
use crate::server::Server;
use crate::settings::Settings;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateResult {
    pub database: String,
    pub dumps: Vec<DumpResult>,
    pub downloads: Vec<FetchResult>,
    pub import: ImportResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupResult>,
    pub warnings: Vec<String>,
}

/// Run the full workflow.
///
/// `connect` opens a host for each server carrying the configured role.
/// `ask_database_name` receives the locally configured database name as
/// the default and returns the name to restore into.
pub fn replicate<H, C, A>(
    settings: &Settings,
    runner: &dyn LocalRunner,
    mut connect: C,
    ask_database_name: A,
) -> Result<ReplicateResult>
where
    H: RemoteHost,
    C: FnMut(&Server) -> Result<H>,
    A: FnOnce(&str) -> Result<String>,
{
    let servers = settings.servers_for_role()?;

    let mut local = ConfigResolver::from_settings(settings);
    let local_config = local.local(runner, settings)?;
    let database = ask_database_name(local_config.database.as_deref().unwrap_or(""))?;

    let mut dumps = Vec::with_capacity(servers.len());
    let mut downloads = Vec::with_capacity(servers.len());
    let mut warnings = Vec::new();

    for server in servers {
        let host = connect(server)?;
        let mut resolver = ConfigResolver::from_settings(settings);
        let remote_config = resolver.remote(&host, settings)?;

        let created = dump::create_dump(&host, settings, &remote_config)?;
        let fetched = fetch::download_latest_dump(&host, settings, Some(&created.path))?;
        if let Some(w) = &fetched.warning {
            warnings.push(w.clone());
        }

        dumps.push(created);
        downloads.push(fetched);
    }

    let imported = import::import_latest_dump(runner, settings, &local_config, &database)?;
    if let Some(w) = &imported.warning {
        warnings.push(w.clone());
    }

    let cleanup = if settings.keep_local_dumps > 0 {
        Some(retention::cleanup_old_dumps(settings)?)
    } else {
        None
    };

    Ok(ReplicateResult {
        database,
        dumps,
        downloads,
        import: imported,
        cleanup,
        warnings,
    })
}
