use clap::Args;

use pgreplicate::executor::SystemRunner;
use pgreplicate::replicate::{self, ReplicateResult};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ReplicateArgs {
    /// Database to restore into (prompted on a terminal when omitted)
    #[arg(long)]
    database_name: Option<String>,
}

pub fn run(args: ReplicateArgs, global: &GlobalArgs) -> CmdResult<ReplicateResult> {
    let settings = global.settings()?;
    let explicit = args.database_name;

    let result = replicate::replicate(&settings, &SystemRunner, super::connect, |default| {
        super::database_name(explicit, default)
    })?;

    Ok((result, 0))
}
