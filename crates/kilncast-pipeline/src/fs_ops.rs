//! Filesystem operations for run execution.
//!
//! Reconciliation correctness leans on a few properties kept here in one
//! place: deletes treat not-found as success, JSON state lands through a
//! temp file and rename, directory creation is race-safe, and empty-parent
//! cleanup tolerates a directory filling up concurrently.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use kilncast_core::error::{KilncastError, KilncastResult};

/// Reads a whole UTF-8 file.
pub async fn read_to_string(path: &Path) -> KilncastResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| KilncastError::io(path, e))
}

/// Writes a whole UTF-8 file, creating parent directories.
pub async fn write_text(path: &Path, text: &str) -> KilncastResult<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| KilncastError::io(path, e))
}

/// Copies a file byte-for-byte, creating parent directories.
pub async fn copy_file(source: &Path, target: &Path) -> KilncastResult<()> {
    ensure_parent(target).await?;
    tokio::fs::copy(source, target)
        .await
        .map_err(|e| KilncastError::io(source, e))?;
    Ok(())
}

/// Copies `source` over `target` unless the target is at least as new.
///
/// Returns whether a copy happened.
pub async fn copy_if_stale(
    source: &Path,
    target: &Path,
    source_modified: SystemTime,
) -> KilncastResult<bool> {
    match tokio::fs::metadata(target).await {
        Ok(meta) => {
            if let Ok(target_modified) = meta.modified() {
                if source_modified <= target_modified {
                    return Ok(false);
                }
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(KilncastError::io(target, err)),
    }
    copy_file(source, target).await?;
    Ok(true)
}

/// Removes a file; a missing file counts as already removed.
pub async fn remove_file_idempotent(path: &Path) -> KilncastResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(KilncastError::io(path, err)),
    }
}

/// Removes now-empty directories from `start` upward, stopping at (and
/// never removing) `root`. The walk ends at the first directory that is
/// not empty, including one that filled up concurrently.
pub async fn remove_empty_parents(start: &Path, root: &Path) {
    let mut current = start.to_path_buf();
    while current != root && current.starts_with(root) {
        match tokio::fs::remove_dir(&current).await {
            Ok(()) => trace!(path = %current.display(), "removed empty directory"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(_) => break,
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}

/// Moves a file into a holding directory, keeping the name unique.
///
/// Falls back to copy-and-delete when rename is not possible, e.g. across
/// filesystems.
pub async fn relocate_into(source: &Path, holding_dir: &Path) -> KilncastResult<PathBuf> {
    tokio::fs::create_dir_all(holding_dir)
        .await
        .map_err(|e| KilncastError::io(holding_dir, e))?;
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    let mut destination = holding_dir.join(&name);
    let mut attempt = 1u32;
    while tokio::fs::try_exists(&destination)
        .await
        .map_err(|e| KilncastError::io(&destination, e))?
    {
        destination = holding_dir.join(format!("{attempt}_{name}"));
        attempt += 1;
    }
    match tokio::fs::rename(source, &destination).await {
        Ok(()) => Ok(destination),
        Err(_) => {
            tokio::fs::copy(source, &destination)
                .await
                .map_err(|e| KilncastError::io(source, e))?;
            tokio::fs::remove_file(source)
                .await
                .map_err(|e| KilncastError::io(source, e))?;
            Ok(destination)
        }
    }
}

/// Loads a JSON document, treating a missing file as the default value.
pub async fn load_json_or_default<T>(path: &Path) -> KilncastResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => return Err(KilncastError::io(path, err)),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes a JSON document atomically: temp file beside the target, then
/// rename over it.
pub async fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> KilncastResult<()> {
    ensure_parent(path).await?;
    let text = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .map_err(|e| KilncastError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| KilncastError::io(path, e))?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> KilncastResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| KilncastError::io(parent, e))?;
    }
    Ok(())
}
