//! Async file system wrapper.
//!
//! Every failure is normalized to [`FsError`]: `NotFound`, `AlreadyExists`,
//! `InvalidInput` or `Io`.
//!
//! # Atomic Writes
//!
//! All writes go through write-then-rename:
//!
//! 1. Write to `file.tmp`
//! 2. Rename to `file` (atomic on Unix)

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::error::FsError;

/// Check whether a file or directory exists.
pub async fn exists(path: &Path) -> Result<bool, FsError> {
    fs::try_exists(path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// Read a file as UTF-8 text.
pub async fn read_text(path: &Path) -> Result<String, FsError> {
    fs::read_to_string(path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// Read and parse a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FsError> {
    let contents = read_text(path).await?;
    serde_json::from_str(&contents).map_err(|e| FsError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

fn temp_path(path: &Path) -> Result<PathBuf, FsError> {
    let name = path
        .file_name()
        .ok_or_else(|| FsError::InvalidInput(format!("{} has no file name", path.display())))?;
    let mut temp = name.to_os_string();
    temp.push(".tmp");
    Ok(path.with_file_name(temp))
}

/// Write text to a file, creating parent directories as needed.
pub async fn write_text(path: &Path, contents: &str) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        make_directory(parent).await?;
    }

    let temp = temp_path(path)?;
    fs::write(&temp, contents)
        .await
        .map_err(|e| FsError::io(&temp, e))?;
    fs::rename(&temp, path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// Serialize a value as pretty JSON and write it.
///
/// Fails with `InvalidInput` if the value cannot be serialized.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FsError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| FsError::InvalidInput(format!("not serializable: {e}")))?;
    write_text(path, &json).await
}

/// Delete a file. Fails with `NotFound` if it is absent.
pub async fn delete(path: &Path) -> Result<(), FsError> {
    fs::remove_file(path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// Create a directory and its parents. Succeeds if it already exists.
pub async fn make_directory(path: &Path) -> Result<(), FsError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(FsError::AlreadyExists(path.to_path_buf())),
        Err(_) => {}
    }

    fs::create_dir_all(path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// Recursively delete a directory. Fails with `NotFound` if it is absent.
pub async fn delete_directory(path: &Path) -> Result<(), FsError> {
    fs::remove_dir_all(path)
        .await
        .map_err(|e| FsError::io(path, e))
}

/// List the names of the subdirectories of `path`. Empty if `path` is absent.
pub async fn list_directories(path: &Path) -> Result<Vec<String>, FsError> {
    let mut names = Vec::new();

    let mut entries = match fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(FsError::io(path, e)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FsError::io(path, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_creates_intermediate_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.json");

        write_json(&path, &json!({"x": 1})).await.unwrap();

        assert!(exists(&path).await.unwrap());
        let value: serde_json::Value = read_json(&path).await.unwrap();
        assert_eq!(value, json!({"x": 1}));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seq");

        write_text(&path, "ACGT").await.unwrap();

        assert!(!dir.path().join("seq.tmp").exists());
        assert_eq!(read_text(&path).await.unwrap(), "ACGT");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = read_text(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            delete(&dir.path().join("nope")).await,
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            delete_directory(&dir.path().join("nope")).await,
            Err(FsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn make_directory_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x/y");

        make_directory(&path).await.unwrap();
        make_directory(&path).await.unwrap();

        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn make_directory_over_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file");
        write_text(&path, "x").await.unwrap();

        assert!(matches!(
            make_directory(&path).await,
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn delete_directory_is_recursive() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        write_text(&root.join("a/b.txt"), "x").await.unwrap();

        delete_directory(&root).await.unwrap();

        assert!(!exists(&root).await.unwrap());
    }

    #[tokio::test]
    async fn list_directories_skips_files() {
        let dir = tempdir().unwrap();
        make_directory(&dir.path().join("b")).await.unwrap();
        make_directory(&dir.path().join("a")).await.unwrap();
        write_text(&dir.path().join("c.json"), "{}").await.unwrap();

        let names = list_directories(dir.path()).await.unwrap();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

        let missing = list_directories(&dir.path().join("none")).await.unwrap();
        assert!(missing.is_empty());
    }
}
