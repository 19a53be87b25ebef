//! Migration files on disk. The filename is the version.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};

const EXTENSION: &str = "sql";

/// A migration discovered on disk but not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: String,
    pub path: PathBuf,
}

/// A migration with its SQL text loaded.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: String,
    pub path: PathBuf,
    pub sql: String,
}

impl MigrationFile {
    pub async fn load(&self) -> Result<Migration> {
        let sql = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MigrateError::Read {
                path: self.path.clone(),
                source,
            })?;

        Ok(Migration {
            version: self.version.clone(),
            path: self.path.clone(),
            sql,
        })
    }
}

/// All `*.sql` files directly inside `dir`, sorted by filename.
/// A missing directory yields an empty list.
pub fn list_migrations(dir: &Path) -> Result<Vec<MigrationFile>> {
    let read_err = |source| MigrateError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_err(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }

        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrateError::InvalidFileName(path.clone()))?
            .to_string();

        files.push(MigrationFile { version, path });
    }

    files.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(files)
}
