use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidYaml,
    ConfigInvalidValue,
    ConfigEnvironmentNotFound,
    ConfigTemplateFailed,
    ConfigUnreadable,

    ValidationMissingArgument,

    ServerNotFound,
    BackupNotFound,

    SshIdentityFileNotFound,

    RemoteCommandFailed,
    LocalCommandFailed,
    TransferFailed,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigEnvironmentNotFound => "config.environment_not_found",
            ErrorCode::ConfigTemplateFailed => "config.template_failed",
            ErrorCode::ConfigUnreadable => "config.unreadable",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",

            ErrorCode::ServerNotFound => "server.not_found",
            ErrorCode::BackupNotFound => "backup.not_found",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",
            ErrorCode::LocalCommandFailed => "local.command_failed",
            ErrorCode::TransferFailed => "transfer.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }

    /// Whether this code belongs to the config resolution family.
    pub fn is_config(&self) -> bool {
        self.as_str().starts_with("config.")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParseDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentNotFoundDetails {
    pub environment: String,
    pub path: String,
    pub available: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub target: TargetDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailedDetails {
    pub source: String,
    pub destination: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub server_id: String,
    pub identity_file: String,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn server_not_found(role: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ServerNotFound,
            "No server configured for role",
            to_details(NotFoundDetails { id: role.into() }),
        )
        .with_hint("Add a server with this role to the 'servers' list in pgreplicate.json")
    }

    pub fn backup_not_found(directory: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::BackupNotFound,
            "No database dump found",
            to_details(NotFoundDetails {
                id: directory.into(),
            }),
        )
        .with_hint("Run 'pgreplicate backup create' to produce a dump first")
    }

    pub fn ssh_identity_file_not_found(
        server_id: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            to_details(SshIdentityFileNotFoundDetails {
                server_id: server_id.into(),
                identity_file: identity_file.into(),
            }),
        )
    }

    pub fn remote_command_failed(details: CommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::RemoteCommandFailed,
            "Remote command failed",
            to_details(details),
        )
    }

    pub fn local_command_failed(details: CommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::LocalCommandFailed,
            "Local command failed",
            to_details(details),
        )
    }

    pub fn transfer_failed(details: TransferFailedDetails) -> Self {
        Self::new(
            ErrorCode::TransferFailed,
            "File transfer failed",
            to_details(details),
        )
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            to_details(ConfigMissingKeyDetails {
                key: key.into(),
                path,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigParseDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in database configuration",
            to_details(ConfigParseDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn config_environment_not_found(
        environment: impl Into<String>,
        path: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        let environment = environment.into();
        Self::new(
            ErrorCode::ConfigEnvironmentNotFound,
            format!("Environment '{}' not found in database configuration", environment),
            to_details(EnvironmentNotFoundDetails {
                environment,
                path: path.into(),
                available,
            }),
        )
    }

    pub fn config_template_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigTemplateFailed,
            "Failed to expand database configuration template",
            to_details(ConfigParseDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_unreadable(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigUnreadable,
            "Database configuration could not be read",
            to_details(ConfigParseDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_not_found_lists_available_keys() {
        let err = Error::config_environment_not_found(
            "staging",
            "config/database.yml",
            vec!["development".to_string(), "production".to_string()],
        );

        assert_eq!(err.code, ErrorCode::ConfigEnvironmentNotFound);
        assert!(err.message.contains("staging"));
        assert_eq!(err.details["available"][1], "production");
    }

    #[test]
    fn config_family_is_detected_from_code() {
        assert!(ErrorCode::ConfigInvalidYaml.is_config());
        assert!(ErrorCode::ConfigTemplateFailed.is_config());
        assert!(!ErrorCode::RemoteCommandFailed.is_config());
    }

    #[test]
    fn hints_accumulate() {
        let err = Error::backup_not_found("tmp/postgres_backup").with_hint("second");
        assert_eq!(err.hints.len(), 2);
        assert_eq!(err.hints[1].message, "second");
    }
}
