//! Database connection parameters resolved from `database.yml`.
//!
//! Each environment entry is merged over `{host: "localhost"}`; loaded values
//! win. A `ConfigResolver` resolves the remote and local sides at most once
//! and hands out copies afterwards.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value as YamlValue};
use std::collections::BTreeMap;
use std::path::Path;

use crate::erb::{self, Expansion};
use crate::error::{Error, Result};
use crate::executor::{LocalRunner, RemoteHost};
use crate::settings::{Settings, DATABASE_YML, LOCAL_ENVIRONMENT};
use crate::utils::io;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host", deserialize_with = "host_or_default")]
    pub host: String,
    #[serde(
        default,
        deserialize_with = "optional_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub user: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        serialize_with = "redact",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub database: Option<String>,
    /// Keys we do not interpret (`adapter`, `pool`, `encoding`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            user: None,
            username: None,
            password: None,
            database: None,
            extra: BTreeMap::new(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl DatabaseConfig {
    /// Build from one environment entry merged over the defaults.
    pub fn from_mapping(entry: &Mapping, source: &str) -> Result<Self> {
        let merged = merge_over_defaults(entry);
        serde_yml::from_value(YamlValue::Mapping(merged)).map_err(|e| {
            Error::config_invalid_value("database", Some(source.to_string()), e.to_string())
        })
    }

    /// User for `-U` and `.pgpass`: `user`, falling back to `username`.
    /// Empty values count as unset.
    pub fn effective_user(&self) -> Option<&str> {
        non_empty(self.user.as_deref()).or_else(|| non_empty(self.username.as_deref()))
    }

    pub fn password_or_empty(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// Port for `pg_restore`, 5432 when unset.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn require_database(&self, side: &str) -> Result<&str> {
        non_empty(self.database.as_deref()).ok_or_else(|| {
            Error::config_missing_key("database", Some(format!("{} database config", side)))
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `{host: localhost}` with every key of `entry` layered on top.
pub fn merge_over_defaults(entry: &Mapping) -> Mapping {
    let mut merged = Mapping::new();
    merged.insert(
        YamlValue::String("host".to_string()),
        YamlValue::String(DEFAULT_HOST.to_string()),
    );
    for (key, value) in entry {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Parse a whole `database.yml` and pick one environment's entry.
///
/// Lookup tries the exact key first, then a case-insensitive match.
pub fn select_environment(yaml: &str, environment: &str, source: &str) -> Result<DatabaseConfig> {
    let mut doc: YamlValue =
        serde_yml::from_str(yaml).map_err(|e| Error::config_invalid_yaml(source, e.to_string()))?;
    doc.apply_merge()
        .map_err(|e| Error::config_invalid_yaml(source, e.to_string()))?;

    let root = doc
        .as_mapping()
        .ok_or_else(|| Error::config_invalid_yaml(source, "top level is not a mapping"))?;

    let entry = root.get(environment).or_else(|| {
        root.iter()
            .find(|(k, _)| {
                k.as_str()
                    .is_some_and(|k| k.eq_ignore_ascii_case(environment))
            })
            .map(|(_, v)| v)
    });

    let Some(entry) = entry else {
        let available = root
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        return Err(Error::config_environment_not_found(
            environment,
            source,
            available,
        ));
    };

    let mapping = entry.as_mapping().ok_or_else(|| {
        Error::config_invalid_value(
            environment,
            Some(source.to_string()),
            "Environment entry must be a mapping of connection parameters",
        )
    })?;

    DatabaseConfig::from_mapping(mapping, source)
}

/// Resolves and caches the remote and local database configs of one run.
///
/// Use one resolver per target host; the local side may be shared by
/// keeping a single resolver for it.
#[derive(Debug, Default, Clone)]
pub struct ConfigResolver {
    remote: Option<DatabaseConfig>,
    local: Option<DatabaseConfig>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache from explicit overrides in settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            remote: settings.remote_database_config.clone(),
            local: settings.local_database_config.clone(),
        }
    }

    pub fn remote(&mut self, host: &dyn RemoteHost, settings: &Settings) -> Result<DatabaseConfig> {
        if let Some(config) = &self.remote {
            return Ok(config.clone());
        }
        let config = load_remote(host, settings)?;
        self.remote = Some(config.clone());
        Ok(config)
    }

    pub fn local(&mut self, runner: &dyn LocalRunner, settings: &Settings) -> Result<DatabaseConfig> {
        if let Some(config) = &self.local {
            return Ok(config.clone());
        }
        let config = load_local(runner, settings)?;
        self.local = Some(config.clone());
        Ok(config)
    }
}

fn load_remote(host: &dyn RemoteHost, settings: &Settings) -> Result<DatabaseConfig> {
    let environment = settings.require_environment()?;
    let file = settings.remote_database_yml()?;
    let release = settings.current_path()?;

    let direct = host.test(&erb::ruby_probe().current_dir(&release));
    log_status!(
        "config",
        "Reading {} on {} ({})",
        file,
        host.label(),
        if direct { "ruby" } else { "bundle exec ruby" }
    );

    let command = erb::interpreter_command(&file, direct).current_dir(&release);
    let output = host.execute(&command);
    if !output.success {
        return Err(Error::config_template_failed(&file, output.error_text()));
    }

    select_environment(&output.stdout, &environment, &file)
}

fn load_local(runner: &dyn LocalRunner, settings: &Settings) -> Result<DatabaseConfig> {
    let path = settings.local_database_yml();
    let source = path.display().to_string();

    let raw = io::read_file(&path, "read database.yml")
        .map_err(|e| Error::config_unreadable(&source, detail_error(&e)))?;

    let content = if erb::has_tags(&raw) {
        expand_local(runner, settings, &raw, &path)?
    } else {
        raw
    };

    select_environment(&content, LOCAL_ENVIRONMENT, &source)
}

fn expand_local(
    runner: &dyn LocalRunner,
    settings: &Settings,
    raw: &str,
    path: &Path,
) -> Result<String> {
    let source = path.display().to_string();

    let expansion = erb::expand_builtin(raw, |name| std::env::var(name).ok())
        .map_err(|e| Error::config_template_failed(&source, e))?;

    match expansion {
        Expansion::Expanded(content) => Ok(content),
        Expansion::Unsupported(tag) => {
            log_status!("config", "Expanding '{}' with Ruby", tag);
            let root = settings.local_root_path();
            let root = root.display().to_string();
            let direct = runner.test(&erb::ruby_probe().current_dir(&root));
            // The interpreter runs inside the root, so the file is named relative to it.
            let command = erb::interpreter_command(DATABASE_YML, direct).current_dir(&root);
            let output = runner.execute(&command);
            if output.success {
                Ok(output.stdout)
            } else {
                Err(Error::config_template_failed(&source, output.error_text()))
            }
        }
    }
}

fn detail_error(err: &Error) -> String {
    err.details
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or(&err.message)
        .to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn optional_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}

fn host_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_scalar(deserializer)?
        .filter(|h| !h.is_empty())
        .unwrap_or_else(default_host))
}

fn optional_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(i)) => u16::try_from(i)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("port out of range: {}", i))),
        Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Str(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port: {}", s))),
        Some(other) => Err(de::Error::custom(format!(
            "invalid port: {}",
            other.into_string()
        ))),
    }
}

fn redact<S>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(_) => serializer.serialize_str("***"),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YML: &str = r#"
default: &default
  adapter: postgresql
  pool: 5

development:
  <<: *default
  database: app_development

Production:
  <<: *default
  host: db.internal
  port: "6432"
  username: app
  password: 12345
  database: app_production

broken: just-a-string
"#;

    #[test]
    fn database_only_entry_gets_localhost() {
        let config = select_environment("test:\n  database: app_test\n", "test", "db.yml").unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.database.as_deref(), Some("app_test"));
        assert_eq!(config.port, None);
        assert_eq!(config.user, None);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn loaded_host_wins_over_default() {
        let config = select_environment(SAMPLE_YML, "production", "db.yml").unwrap();
        assert_eq!(config.host, "db.internal");
    }

    #[test]
    fn environment_lookup_is_case_insensitive_and_applies_merge_keys() {
        let config = select_environment(SAMPLE_YML, "production", "db.yml").unwrap();
        assert_eq!(config.port, Some(6432));
        assert_eq!(config.password.as_deref(), Some("12345"));
        assert_eq!(config.extra.get("adapter"), Some(&serde_json::json!("postgresql")));
    }

    #[test]
    fn missing_environment_is_a_config_error() {
        let err = select_environment(SAMPLE_YML, "staging", "db.yml").unwrap_err();
        assert_eq!(err.code.as_str(), "config.environment_not_found");
        assert!(err.code.is_config());
    }

    #[test]
    fn non_mapping_entry_is_rejected() {
        let err = select_environment(SAMPLE_YML, "broken", "db.yml").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = select_environment("development: [unclosed", "development", "db.yml").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_yaml");
    }

    #[test]
    fn effective_user_prefers_user_over_username() {
        let mut config = DatabaseConfig {
            user: Some("primary".to_string()),
            username: Some("secondary".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_user(), Some("primary"));

        config.user = Some(String::new());
        assert_eq!(config.effective_user(), Some("secondary"));

        config.username = None;
        assert_eq!(config.effective_user(), None);
    }

    #[test]
    fn null_host_falls_back_to_localhost() {
        let config = select_environment("development:\n  host:\n", "development", "db.yml").unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port_or_default(), 5432);
    }

    #[test]
    fn password_is_redacted_when_serialized() {
        let config = DatabaseConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"password\":\"***\""));
    }

    #[test]
    fn overrides_deserialize_from_json() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"database":"app","port":5433,"user":"me"}"#).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, Some(5433));
        assert_eq!(config.effective_user(), Some("me"));
    }
}
