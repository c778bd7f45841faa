use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_ROLE: &str = "db";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
}

fn default_port() -> u16 {
    22
}

fn default_roles() -> Vec<String> {
    vec![DEFAULT_ROLE.to_string()]
}

impl Server {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: None,
            host: host.into(),
            user: user.into(),
            port: default_port(),
            identity_file: None,
            roles: default_roles(),
        }
    }

    /// Identifier used in logs and error details: explicit id, else the host.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.host)
    }

    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Servers carrying `role`, in configuration order.
pub fn for_role<'a>(servers: &'a [Server], role: &str) -> Result<Vec<&'a Server>> {
    let matched: Vec<&Server> = servers.iter().filter(|s| s.has_role(role)).collect();
    if matched.is_empty() {
        return Err(Error::server_not_found(role));
    }
    Ok(matched)
}

/// Check every server has a host and user.
pub fn validate_all(servers: &[Server]) -> Result<()> {
    for server in servers {
        if !server.is_valid() {
            return Err(Error::config_invalid_value(
                "servers",
                Some(server.label().to_string()),
                "Server entries need both 'host' and 'user'",
            ));
        }
    }
    Ok(())
}
