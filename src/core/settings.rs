use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db_config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::server::{self, Server, DEFAULT_ROLE};
use crate::utils::io;

/// Settings file looked up in the working directory when `--config` is absent.
pub const SETTINGS_FILE: &str = "pgreplicate.json";

/// The local side always restores into the development entry.
pub const LOCAL_ENVIRONMENT: &str = "development";

/// Rails database config, relative to an application root.
pub const DATABASE_YML: &str = "config/database.yml";

pub const DUMP_PREFIX: &str = "db_backup";
pub const DUMP_EXTENSION: &str = "sqlc";

/// Root structure of `pgreplicate.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Remote application root, e.g. `/srv/app`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rails_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres_env: Option<String>,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(default = "default_role")]
    pub role: String,

    /// 0 keeps everything; N keeps the N newest local dumps.
    #[serde(default)]
    pub keep_local_dumps: u32,

    #[serde(default)]
    pub compression_level: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_dump_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_database_config: Option<DatabaseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_database_config: Option<DatabaseConfig>,

    #[serde(default = "default_local_root")]
    pub local_root: String,

    #[serde(default)]
    pub servers: Vec<Server>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deploy_to: None,
            stage: None,
            rails_env: None,
            rack_env: None,
            postgres_env: None,
            backup_dir: default_backup_dir(),
            role: default_role(),
            keep_local_dumps: 0,
            compression_level: 0,
            remote_dump_path: None,
            local_database_config: None,
            remote_database_config: None,
            local_root: default_local_root(),
            servers: Vec::new(),
        }
    }
}

fn default_backup_dir() -> String {
    "postgres_backup".to_string()
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_local_root() -> String {
    ".".to_string()
}

/// Values supplied on the command line; `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub backup_dir: Option<String>,
    pub role: Option<String>,
    pub environment: Option<String>,
    pub keep_local_dumps: Option<u32>,
    pub compression_level: Option<u8>,
}

impl Settings {
    /// Load settings from `path`, or from `pgreplicate.json` in the working
    /// directory. A missing default file yields built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(SETTINGS_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(Error::config_unreadable(
                    path.display().to_string(),
                    "file does not exist",
                ));
            }
            return Ok(Self::default());
        }

        let content = io::read_file(&path, &format!("read {}", path.display()))?;
        Self::from_json(&content, &path.display().to_string())
    }

    pub fn from_json(content: &str, source: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))
    }

    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        if let Some(dir) = &overrides.backup_dir {
            self.backup_dir = dir.clone();
        }
        if let Some(role) = &overrides.role {
            self.role = role.clone();
        }
        if let Some(env) = &overrides.environment {
            self.postgres_env = Some(env.clone());
        }
        if let Some(keep) = overrides.keep_local_dumps {
            self.keep_local_dumps = keep;
        }
        if let Some(level) = overrides.compression_level {
            self.compression_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::config_invalid_value(
                "compression_level",
                Some(self.compression_level.to_string()),
                "Compression level must be between 0 and 9",
            ));
        }
        if !is_relative_subpath(&self.backup_dir) {
            return Err(Error::config_invalid_value(
                "backup_dir",
                Some(self.backup_dir.clone()),
                "Backup directory must be a non-empty relative path without '..'",
            ));
        }
        if self.role.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "role",
                Some(self.role.clone()),
                "Role must not be empty",
            ));
        }
        server::validate_all(&self.servers)
    }

    /// Environment name from `postgres_env`, `rack_env`, `rails_env`, then
    /// `stage`, lowercased.
    pub fn environment(&self) -> Option<String> {
        [
            &self.postgres_env,
            &self.rack_env,
            &self.rails_env,
            &self.stage,
        ]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_lowercase())
    }

    pub fn require_environment(&self) -> Result<String> {
        self.environment().ok_or_else(|| {
            Error::config_missing_key("postgres_env", Some(SETTINGS_FILE.to_string()))
                .with_hint("Set one of postgres_env, rack_env, rails_env or stage, or pass --env")
        })
    }

    pub fn require_deploy_to(&self) -> Result<&str> {
        match self.deploy_to.as_deref() {
            Some(d) if !d.trim().is_empty() => Ok(d.trim_end_matches('/')),
            _ => Err(Error::config_missing_key(
                "deploy_to",
                Some(SETTINGS_FILE.to_string()),
            )),
        }
    }

    pub fn shared_path(&self) -> Result<String> {
        Ok(format!("{}/shared", self.require_deploy_to()?))
    }

    pub fn current_path(&self) -> Result<String> {
        Ok(format!("{}/current", self.require_deploy_to()?))
    }

    /// `<deploy_to>/shared/<backup_dir>`
    pub fn remote_backup_dir(&self) -> Result<String> {
        Ok(format!("{}/{}", self.shared_path()?, self.backup_dir))
    }

    pub fn remote_database_yml(&self) -> Result<String> {
        Ok(format!("{}/{}", self.current_path()?, DATABASE_YML))
    }

    pub fn local_root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.local_root).to_string())
    }

    /// `<local_root>/tmp/<backup_dir>`
    pub fn local_backup_dir(&self) -> PathBuf {
        self.local_root_path().join("tmp").join(&self.backup_dir)
    }

    pub fn local_database_yml(&self) -> PathBuf {
        self.local_root_path().join(DATABASE_YML)
    }

    pub fn pgpass_path(&self) -> PathBuf {
        self.local_root_path().join(".pgpass")
    }

    pub fn servers_for_role(&self) -> Result<Vec<&Server>> {
        server::for_role(&self.servers, &self.role)
    }
}

/// Relative path that stays below its parent, e.g. `db/backups`.
fn is_relative_subpath(dir: &str) -> bool {
    let dir = dir.trim();
    !dir.is_empty()
        && !dir.starts_with('/')
        && dir.split('/').all(|part| part != "..")
        && dir.split('/').any(|part| !part.is_empty() && part != ".")
}

/// `db_backup.<timestamp>.sqlc`
pub fn dump_file_name(timestamp: &str) -> String {
    format!("{}.{}.{}", DUMP_PREFIX, timestamp, DUMP_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_to_empty_file() {
        let settings = Settings::from_json("{}", "pgreplicate.json").unwrap();
        assert_eq!(settings.backup_dir, "postgres_backup");
        assert_eq!(settings.role, "db");
        assert_eq!(settings.keep_local_dumps, 0);
        assert_eq!(settings.compression_level, 0);
        assert_eq!(settings.local_root, ".");
        assert!(settings.servers.is_empty());
    }

    #[test]
    fn environment_chain_prefers_postgres_env() {
        let mut settings = Settings {
            stage: Some("Staging".to_string()),
            rails_env: Some("production".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.environment().as_deref(), Some("production"));

        settings.rack_env = Some("rack".to_string());
        assert_eq!(settings.environment().as_deref(), Some("rack"));

        settings.postgres_env = Some("PG".to_string());
        assert_eq!(settings.environment().as_deref(), Some("pg"));

        let only_stage = Settings {
            stage: Some("Staging".to_string()),
            ..Default::default()
        };
        assert_eq!(only_stage.environment().as_deref(), Some("staging"));
    }

    #[test]
    fn missing_environment_is_config_error() {
        let err = Settings::default().require_environment().unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
    }

    #[test]
    fn remote_paths_derive_from_deploy_to() {
        let settings = Settings {
            deploy_to: Some("/srv/app/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.remote_backup_dir().unwrap(),
            "/srv/app/shared/postgres_backup"
        );
        assert_eq!(
            settings.remote_database_yml().unwrap(),
            "/srv/app/current/config/database.yml"
        );
    }

    #[test]
    fn remote_paths_require_deploy_to() {
        let err = Settings::default().remote_backup_dir().unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
    }

    #[test]
    fn local_paths_live_under_local_root() {
        let settings = Settings {
            local_root: "/work/app".to_string(),
            backup_dir: "dumps".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.local_backup_dir(), PathBuf::from("/work/app/tmp/dumps"));
        assert_eq!(settings.pgpass_path(), PathBuf::from("/work/app/.pgpass"));
        assert_eq!(
            settings.local_database_yml(),
            PathBuf::from("/work/app/config/database.yml")
        );
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::default();
        settings.apply(&SettingsOverrides {
            backup_dir: Some("dumps".to_string()),
            role: Some("primary".to_string()),
            environment: Some("staging".to_string()),
            keep_local_dumps: Some(3),
            compression_level: Some(6),
        });
        assert_eq!(settings.backup_dir, "dumps");
        assert_eq!(settings.role, "primary");
        assert_eq!(settings.environment().as_deref(), Some("staging"));
        assert_eq!(settings.keep_local_dumps, 3);
        assert_eq!(settings.compression_level, 6);
    }

    #[test]
    fn compression_level_is_validated() {
        let settings = Settings {
            compression_level: 10,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn backup_dir_may_be_nested_but_not_escape() {
        for ok in ["dumps", "db/backups", "./dumps"] {
            let settings = Settings {
                backup_dir: ok.to_string(),
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "{}", ok);
        }
        for bad in ["", " ", "/var/dumps", "../dumps", "db/../../x", "."] {
            let settings = Settings {
                backup_dir: bad.to_string(),
                ..Default::default()
            };
            let err = settings.validate().unwrap_err();
            assert_eq!(err.code.as_str(), "config.invalid_value", "{}", bad);
        }

        let settings = Settings {
            backup_dir: "db/backups".to_string(),
            local_root: "/work/app".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.local_backup_dir(),
            PathBuf::from("/work/app/tmp/db/backups")
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"deploy_to":"/srv/app","servers":[{"host":"db1","user":"deploy"}]}"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.deploy_to.as_deref(), Some("/srv/app"));
        assert_eq!(settings.servers[0].port, 22);
        assert_eq!(settings.servers_for_role().unwrap().len(), 1);
    }

    #[test]
    fn load_rejects_missing_explicit_file_and_bad_json() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(
            Settings::load(Some(&missing)).unwrap_err().code.as_str(),
            "config.unreadable"
        );

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert_eq!(
            Settings::load(Some(&bad)).unwrap_err().code.as_str(),
            "config.invalid_json"
        );
    }

    #[test]
    fn dump_file_name_format() {
        assert_eq!(
            dump_file_name("2024-01-02_03-04-05"),
            "db_backup.2024-01-02_03-04-05.sqlc"
        );
    }
}
