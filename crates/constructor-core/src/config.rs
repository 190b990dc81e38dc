//! Storage configuration.
//!
//! Read from the environment:
//!
//! - `CONSTRUCTOR_STORAGE` - storage root (default `~/.constructor/storage`)
//! - `CONSTRUCTOR_COMMIT_NAME` / `CONSTRUCTOR_COMMIT_EMAIL` - author of project commits

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::paths::get_home_dir;

pub const STORAGE_ENV: &str = "CONSTRUCTOR_STORAGE";
pub const COMMIT_NAME_ENV: &str = "CONSTRUCTOR_COMMIT_NAME";
pub const COMMIT_EMAIL_ENV: &str = "CONSTRUCTOR_COMMIT_EMAIL";

const DEFAULT_COMMIT_NAME: &str = "Genetic Constructor";
const DEFAULT_COMMIT_EMAIL: &str = "constructor@localhost";

/// Identity recorded on every commit in a project repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: DEFAULT_COMMIT_NAME.to_string(),
            email: DEFAULT_COMMIT_EMAIL.to_string(),
        }
    }
}

impl CommitAuthor {
    /// The default author with any non-empty environment overrides applied.
    pub fn from_env() -> Self {
        let mut author = Self::default();
        if let Ok(name) = env::var(COMMIT_NAME_ENV) {
            if !name.is_empty() {
                author.name = name;
            }
        }
        if let Ok(email) = env::var(COMMIT_EMAIL_ENV) {
            if !email.is_empty() {
                author.email = email;
            }
        }
        author
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage_root: PathBuf,
    #[serde(default)]
    pub commit_author: CommitAuthor,
}

impl StorageConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            commit_author: CommitAuthor::default(),
        }
    }

    /// Build a config from the process environment.
    ///
    /// Fails only when no storage root is set and no home directory can be found.
    pub fn from_env() -> Result<Self, String> {
        let storage_root = match env::var(STORAGE_ENV) {
            Ok(root) if !root.is_empty() => PathBuf::from(root),
            _ => default_storage_root()?,
        };

        Ok(Self {
            storage_root,
            commit_author: CommitAuthor::from_env(),
        })
    }

    pub fn with_commit_author(mut self, author: CommitAuthor) -> Self {
        self.commit_author = author;
        self
    }
}

/// `~/.constructor/storage`
pub fn default_storage_root() -> Result<PathBuf, String> {
    let home = get_home_dir()?;
    Ok(PathBuf::from(home).join(".constructor").join("storage"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_author() {
        let config = StorageConfig::new("/tmp/storage");
        assert_eq!(config.storage_root, PathBuf::from("/tmp/storage"));
        assert_eq!(config.commit_author.name, "Genetic Constructor");
    }

    #[test]
    fn deserializes_without_author() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"storageRoot": "/srv/constructor"}"#).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/constructor"));
        assert_eq!(config.commit_author, CommitAuthor::default());
    }

    #[test]
    fn with_commit_author_overrides() {
        let author = CommitAuthor {
            name: "Lab Bot".to_string(),
            email: "bot@lab.example".to_string(),
        };
        let config = StorageConfig::new("/tmp/s").with_commit_author(author.clone());
        assert_eq!(config.commit_author, author);
    }
}
