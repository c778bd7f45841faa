use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Names of the regular files directly inside `dir`, unsorted. A missing
/// directory is treated as empty.
pub fn list_files(dir: &Path) -> Result<Vec<String>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("list {}", dir.display())),
            ))
        }
    };

    let mut names = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("list {}", dir.display())))
        })?;
        let is_file = item.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        names.push(item.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", dir.display())))
    })
}

/// Delete a file if it is there. Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_directory_lists_empty() {
        let dir = tempdir().unwrap();
        assert!(list_files(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn lists_only_regular_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.sqlc"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(list_files(dir.path()).unwrap(), vec!["a.sqlc".to_string()]);
    }

    #[test]
    fn remove_if_exists_reports_outcome() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x");
        fs::write(&file, "").unwrap();

        assert!(remove_if_exists(&file).unwrap());
        assert!(!file.exists());
        assert!(!remove_if_exists(&file).unwrap());
    }

    #[test]
    fn ensure_dir_creates_parents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("tmp").join("postgres_backup");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
