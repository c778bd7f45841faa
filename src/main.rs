use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;
use pgreplicate::settings::SettingsOverrides;

mod commands;
mod output;
mod tty;

use commands::{backup, config, replicate};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pgreplicate")]
#[command(version = VERSION)]
#[command(about = "Copy a deployed PostgreSQL database into the local development database")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// Settings file (default: ./pgreplicate.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backup directory name under shared/ remotely and tmp/ locally
    #[arg(long, global = true)]
    backup_dir: Option<String>,

    /// Server role whose hosts are dumped
    #[arg(long, global = true)]
    role: Option<String>,

    /// Remote environment name in database.yml
    #[arg(long, global = true)]
    env: Option<String>,

    /// Number of local dumps to keep (0 keeps all)
    #[arg(long, global = true)]
    keep_local_dumps: Option<u32>,

    /// pg_dump compression level (0-9)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=9))]
    compression_level: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Individual backup steps
    Backup(backup::BackupArgs),
    /// Dump, download, restore and prune in one run
    Replicate(replicate::ReplicateArgs),
    /// Inspect settings
    Config(config::ConfigArgs),
}

impl From<GlobalOpts> for GlobalArgs {
    fn from(opts: GlobalOpts) -> Self {
        GlobalArgs {
            config: opts.config,
            overrides: SettingsOverrides {
                backup_dir: opts.backup_dir,
                role: opts.role,
                environment: opts.env,
                keep_local_dumps: opts.keep_local_dumps,
                compression_level: opts.compression_level,
            },
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs::from(cli.global);

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    // Nothing else can report a failed stdout write.
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
