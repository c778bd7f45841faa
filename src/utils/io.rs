//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Read file contents with standardized error handling.
///
/// Wraps `fs::read_to_string` with consistent `Error::internal_io` formatting.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(operation.to_string())))
}

/// Write content to a file readable and writable by the owner only (0600 on Unix).
///
/// The mode is applied at creation and re-applied afterwards, since an existing
/// file keeps its old permissions when opened for truncation.
pub fn write_private_file(path: &Path, content: &str, operation: &str) -> Result<()> {
    let io_err = |e: std::io::Error| Error::internal_io(e.to_string(), Some(operation.to_string()));

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }

    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)
}
