use clap::{Args, Subcommand};
use serde::Serialize;

use pgreplicate::db_config::ConfigResolver;
use pgreplicate::dump::{self, DumpResult};
use pgreplicate::executor::SystemRunner;
use pgreplicate::fetch::{self, FetchResult};
use pgreplicate::import::{self, ImportResult};
use pgreplicate::retention::{self, CleanupResult};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    command: BackupCommand,
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Dump the database on every host with the configured role
    Create,
    /// Download the newest remote dump and delete the remote copy
    Download {
        /// Remote file to fetch instead of the newest one
        #[arg(long)]
        remote_path: Option<String>,
    },
    /// Restore the newest local dump into the local database
    Import {
        /// Database to restore into (prompted on a terminal when omitted)
        #[arg(long)]
        database_name: Option<String>,
    },
    /// Delete local dumps beyond the retention count
    Cleanup,
}

#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BackupOutput {
    Create { dumps: Vec<DumpResult> },
    Download { downloads: Vec<FetchResult> },
    Import(ImportResult),
    Cleanup(CleanupResult),
}

pub fn run(args: BackupArgs, global: &GlobalArgs) -> CmdResult<BackupOutput> {
    match args.command {
        BackupCommand::Create => create(global),
        BackupCommand::Download { remote_path } => download(global, remote_path.as_deref()),
        BackupCommand::Import { database_name } => import(global, database_name),
        BackupCommand::Cleanup => cleanup(global),
    }
}

fn create(global: &GlobalArgs) -> CmdResult<BackupOutput> {
    let settings = global.settings()?;
    let mut dumps = Vec::new();

    for server in settings.servers_for_role()? {
        let host = super::connect(server)?;
        let mut resolver = ConfigResolver::from_settings(&settings);
        let config = resolver.remote(&host, &settings)?;
        dumps.push(dump::create_dump(&host, &settings, &config)?);
    }

    Ok((BackupOutput::Create { dumps }, 0))
}

fn download(global: &GlobalArgs, remote_path: Option<&str>) -> CmdResult<BackupOutput> {
    let settings = global.settings()?;
    let mut downloads = Vec::new();

    for server in settings.servers_for_role()? {
        let host = super::connect(server)?;
        downloads.push(fetch::download_latest_dump(&host, &settings, remote_path)?);
    }

    Ok((BackupOutput::Download { downloads }, 0))
}

fn import(global: &GlobalArgs, database_name: Option<String>) -> CmdResult<BackupOutput> {
    let settings = global.settings()?;
    let runner = SystemRunner;

    let mut resolver = ConfigResolver::from_settings(&settings);
    let config = resolver.local(&runner, &settings)?;
    let database = super::database_name(database_name, config.database.as_deref().unwrap_or(""))?;

    let result = import::import_latest_dump(&runner, &settings, &config, &database)?;
    Ok((BackupOutput::Import(result), 0))
}

fn cleanup(global: &GlobalArgs) -> CmdResult<BackupOutput> {
    let settings = global.settings()?;
    Ok((BackupOutput::Cleanup(retention::cleanup_old_dumps(&settings)?), 0))
}
