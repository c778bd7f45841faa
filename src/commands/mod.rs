use std::path::PathBuf;

use pgreplicate::server::Server;
use pgreplicate::settings::{Settings, SettingsOverrides};
use pgreplicate::ssh::SshClient;

pub type CmdResult<T> = pgreplicate::Result<(T, i32)>;

/// Options shared by every subcommand.
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub overrides: SettingsOverrides,
}

impl GlobalArgs {
    /// Load the settings file, overlay command-line values and validate.
    pub fn settings(&self) -> pgreplicate::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        settings.apply(&self.overrides);
        settings.validate()?;
        Ok(settings)
    }
}

pub(crate) fn connect(server: &Server) -> pgreplicate::Result<SshClient> {
    SshClient::from_server(server)
}

/// Target database for a restore: the flag if given, else an interactive
/// prompt on a terminal, else the configured default.
pub(crate) fn database_name(
    explicit: Option<String>,
    default: &str,
) -> pgreplicate::Result<String> {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        return Ok(name);
    }
    if crate::tty::is_stdin_tty() {
        return crate::tty::prompt_with_default("Database to restore into", default);
    }
    Ok(default.to_string())
}

pub mod backup;
pub mod config;
pub mod replicate;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (pgreplicate::Result<serde_json::Value>, i32) {
    crate::tty::status("pgreplicate is working...");

    match command {
        crate::Commands::Backup(args) => dispatch!(args, global, backup),
        crate::Commands::Replicate(args) => dispatch!(args, global, replicate),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
