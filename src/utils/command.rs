//! Command construction primitives.
//!
//! Commands are assembled as an argument list and only rendered into a
//! shell string (with every argument quoted) when they have to cross an
//! SSH connection.

use std::process::Command;

use crate::utils::shell;

const REDACTED: &str = "***";

/// A program invocation: program, arguments, environment and working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    current_dir: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag value` only when a value is present.
    pub fn opt_arg(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.arg(flag).arg(v),
            None => self,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<String>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn get_current_dir(&self) -> Option<&str> {
        self.current_dir.as_deref()
    }

    /// Number of times `flag` appears as a standalone argument.
    pub fn count_flag(&self, flag: &str) -> usize {
        self.args.iter().filter(|a| a.as_str() == flag).count()
    }

    /// Value following the first occurrence of `flag`.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Render for `sh -c` / SSH. Each token is quoted, env vars become
    /// `KEY=value` prefixes and a working directory becomes `cd dir &&`.
    pub fn to_shell_string(&self) -> String {
        self.render(false)
    }

    /// Like `to_shell_string`, but with env values masked. Safe for logs and output.
    pub fn display_redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + self.env.len() + 4);

        if let Some(dir) = &self.current_dir {
            parts.push(format!("cd {} &&", shell::quote_path(dir)));
        }

        for (key, value) in &self.env {
            let value = if redact {
                REDACTED.to_string()
            } else {
                shell::quote_arg(value)
            };
            parts.push(format!("{}={}", key, value));
        }

        parts.push(shell::quote_arg(&self.program));
        parts.extend(self.args.iter().map(|a| shell::quote_arg(a)));
        parts.join(" ")
    }

    /// Build a `std::process::Command` that runs the program directly (no shell).
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_redacted())
    }
}

/// Extract error text from captured streams.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(stdout: &str, stderr: &str) -> String {
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        stdout.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_quoted_shell_string() {
        let cmd = CommandLine::new("pg_dump")
            .env("PGPASSWORD", "s3cret pass")
            .args(["-h", "localhost"])
            .arg("--file=/srv/app/shared/db backups/x.sqlc");

        assert_eq!(
            cmd.to_shell_string(),
            "PGPASSWORD='s3cret pass' pg_dump -h localhost '--file=/srv/app/shared/db backups/x.sqlc'"
        );
    }

    #[test]
    fn redacted_render_masks_env_values() {
        let cmd = CommandLine::new("pg_restore").env("PGPASSFILE", "/home/me/.pgpass");
        assert_eq!(cmd.display_redacted(), "PGPASSFILE=*** pg_restore");
        assert_eq!(cmd.to_string(), "PGPASSFILE=*** pg_restore");
    }

    #[test]
    fn current_dir_prefixes_cd() {
        let cmd = CommandLine::new("ruby").arg("-v").current_dir("/srv/app/current");
        assert_eq!(cmd.to_shell_string(), "cd '/srv/app/current' && ruby -v");
    }

    #[test]
    fn opt_arg_skips_missing_values() {
        let with = CommandLine::new("x").opt_arg("-U", Some("deploy"));
        let without = CommandLine::new("x").opt_arg("-U", None);
        assert_eq!(with.get_args(), ["-U", "deploy"]);
        assert!(without.get_args().is_empty());
    }

    #[test]
    fn flag_helpers() {
        let cmd = CommandLine::new("pg_restore").args(["-c", "-U", "app", "-p", "5432"]);
        assert_eq!(cmd.count_flag("-U"), 1);
        assert_eq!(cmd.flag_value("-p"), Some("5432"));
        assert_eq!(cmd.flag_value("-d"), None);
    }

    #[test]
    fn error_text_prefers_stderr() {
        assert_eq!(error_text("out", "err\n"), "err");
        assert_eq!(error_text("out\n", "  "), "out");
    }
}
