use crate::error::{Error, Result};
use crate::server::Server;
use crate::utils::command::{error_text, CommandLine};
use std::path::Path;
use std::process::{Command, Output};

pub struct SshClient {
    pub label: String,
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the server host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Stderr if present, else stdout.
    pub fn error_text(&self) -> String {
        error_text(&self.stdout, &self.stderr)
    }

    fn from_output(out: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        }
    }
}

impl SshClient {
    pub fn from_server(server: &Server) -> Result<Self> {
        let identity_file = match &server.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        server.label().to_string(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&server.host);
        if is_local {
            log_status!(
                "ssh",
                "Server '{}' is localhost, using local execution",
                server.label()
            );
        }

        Ok(Self {
            label: server.label().to_string(),
            host: server.host.clone(),
            user: server.user.clone(),
            port: server.port,
            identity_file,
            is_local,
        })
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Fail fast on stalled connections or unexpected prompts.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    fn build_scp_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-P".to_string()); // scp uses -P (uppercase) for port
            args.push(self.port.to_string());
        }

        args
    }

    /// Run a command on the server. Attempted once; the caller decides what a
    /// failure means.
    pub fn execute(&self, command: &CommandLine) -> CommandOutput {
        let rendered = command.to_shell_string();

        if self.is_local {
            return execute_local_shell(&rendered);
        }

        let args = self.build_ssh_args(&rendered);
        match Command::new("ssh").args(&args).output() {
            Ok(out) => CommandOutput::from_output(out),
            Err(e) => CommandOutput::failed(-1, format!("SSH error: {}", e)),
        }
    }

    /// Copy a remote file to a local path via scp (plain copy for localhost).
    pub fn download(&self, remote_path: &str, local_path: &Path) -> CommandOutput {
        if self.is_local {
            return match std::fs::copy(remote_path, local_path) {
                Ok(_) => CommandOutput::ok(""),
                Err(e) => CommandOutput::failed(1, format!("Copy error: {}", e)),
            };
        }

        let mut args = self.build_scp_args();
        args.push(format!("{}@{}:{}", self.user, self.host, remote_path));
        args.push(local_path.to_string_lossy().to_string());

        match Command::new("scp").args(&args).output() {
            Ok(out) => CommandOutput::from_output(out),
            Err(e) => CommandOutput::failed(-1, format!("SCP error: {}", e)),
        }
    }
}

/// Run a command directly (no shell) on this machine.
pub fn execute_local_command(command: &CommandLine) -> CommandOutput {
    match command.to_command().output() {
        Ok(out) => CommandOutput::from_output(out),
        Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
    }
}

/// Run an already-rendered shell string through `sh -c`.
fn execute_local_shell(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    match cmd.output() {
        Ok(out) => CommandOutput::from_output(out),
        Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}
