// Command execution seams: remote hosts and the local machine.

use std::path::Path;

use crate::error::{CommandFailedDetails, Error, Result, TargetDetails};
use crate::ssh::{execute_local_command, CommandOutput, SshClient};
use crate::utils::command::CommandLine;

/// A deployment host that commands run on and files are pulled from.
pub trait RemoteHost {
    /// Identifier for logs and error details.
    fn label(&self) -> &str;

    fn execute(&self, command: &CommandLine) -> CommandOutput;

    fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput;

    /// Run a command, turning a non-zero exit into `remote.command_failed`.
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = self.execute(command);
        if output.success {
            Ok(output)
        } else {
            Err(Error::remote_command_failed(failure_details(
                command,
                &output,
                Some(self.label()),
            )))
        }
    }

    /// Run a command and return its stdout.
    fn capture(&self, command: &CommandLine) -> Result<String> {
        self.run(command).map(|out| out.stdout)
    }

    /// Whether a command exits successfully. Used for probes like `ruby -v`.
    fn test(&self, command: &CommandLine) -> bool {
        self.execute(command).success
    }
}

/// Runs commands on the machine pgreplicate itself runs on.
pub trait LocalRunner {
    fn execute(&self, command: &CommandLine) -> CommandOutput;

    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = self.execute(command);
        if output.success {
            Ok(output)
        } else {
            Err(Error::local_command_failed(failure_details(
                command, &output, None,
            )))
        }
    }

    fn capture(&self, command: &CommandLine) -> Result<String> {
        self.run(command).map(|out| out.stdout)
    }

    fn test(&self, command: &CommandLine) -> bool {
        self.execute(command).success
    }
}

impl RemoteHost for SshClient {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&self, command: &CommandLine) -> CommandOutput {
        SshClient::execute(self, command)
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput {
        SshClient::download(self, remote_path, local_path)
    }
}

/// Executes local commands as real processes, without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl LocalRunner for SystemRunner {
    fn execute(&self, command: &CommandLine) -> CommandOutput {
        execute_local_command(command)
    }
}

pub(crate) fn failure_details(
    command: &CommandLine,
    output: &CommandOutput,
    host: Option<&str>,
) -> CommandFailedDetails {
    CommandFailedDetails {
        command: command.display_redacted(),
        exit_code: output.exit_code,
        stdout: output.stdout.clone(),
        stderr: output.stderr.clone(),
        target: TargetDetails {
            server_id: host.map(str::to_string),
            host: host.map(str::to_string),
        },
    }
}
