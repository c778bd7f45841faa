//! Short-lived `.pgpass` credentials file for `pg_restore`.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::io;

/// `*:*:*:<user>:<password>`, with `:` and `\` escaped.
pub fn pgpass_line(user: &str, password: &str) -> String {
    format!("*:*:*:{}:{}", escape_field(user), escape_field(password))
}

fn escape_field(value: &str) -> String {
    value.replace('\\', "\\\\").replace(':', "\\:")
}

/// Owns a written `.pgpass`; the file is removed when the guard drops.
#[derive(Debug)]
pub struct PgPassFile {
    path: PathBuf,
}

impl PgPassFile {
    /// Write the credentials file with owner-only permissions.
    pub fn create(path: &Path, user: &str, password: &str) -> Result<Self> {
        io::write_private_file(path, &pgpass_line(user, password), "write .pgpass")?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PgPassFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log_warning!("import", "Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}
