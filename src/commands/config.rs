use clap::{Args, Subcommand};
use serde::Serialize;

use pgreplicate::db_config::{ConfigResolver, DatabaseConfig};
use pgreplicate::executor::SystemRunner;
use pgreplicate::settings::Settings;

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display effective settings (file + flags) and derived paths
    Show {
        /// Show only built-in defaults (ignore pgreplicate.json)
        #[arg(long)]
        builtin: bool,
        /// Also resolve the local database configuration
        #[arg(long)]
        local: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    settings: Settings,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_backup_dir: Option<String>,
    local_backup_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_database: Option<DatabaseConfig>,
}

pub fn run(args: ConfigArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin, local } => show(global, builtin, local),
    }
}

fn show(global: &crate::commands::GlobalArgs, builtin: bool, local: bool) -> CmdResult<ConfigOutput> {
    let settings = if builtin {
        Settings::default()
    } else {
        global.settings()?
    };

    let local_database = if local {
        let mut resolver = ConfigResolver::from_settings(&settings);
        Some(resolver.local(&SystemRunner, &settings)?)
    } else {
        None
    };

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            environment: settings.environment(),
            remote_backup_dir: settings.remote_backup_dir().ok(),
            local_backup_dir: settings.local_backup_dir().display().to_string(),
            local_database,
            settings,
        },
        0,
    ))
}
