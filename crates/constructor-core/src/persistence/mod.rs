//! Persistence API for projects, blocks, orders and sequences.
//!
//! # Overview
//!
//! [`Persistence`] orchestrates the path resolver, the file system wrapper,
//! the versioning module and the permissions module. Every entity kind gets
//! the same contract:
//!
//! - **Exists** - boolean, optionally as of a commit
//! - **Get** - `Ok(None)` when the entity is missing and no version was asked for
//! - **Create** - assert-new: fails `AlreadyExists` if anything is there
//! - **Write** - validate, stamp identity, upsert (orders are assert-new)
//! - **Merge** - deep-merge into the current manifest, then write
//! - **Delete** - soft for projects, hard for blocks and orders
//!
//! # Commits
//!
//! Low-level writes never commit. History only grows through
//! [`Persistence::project_save`], [`Persistence::project_snapshot`] and
//! [`Persistence::sequence_remove`].
//!
//! # Concurrency
//!
//! Create, write, delete and commit operations hold a per-project lock for
//! their duration. This serializes them within one `Persistence`; separate
//! processes sharing a storage root are not coordinated.

mod blocks;
mod commits;
mod orders;
mod projects;
mod sequences;

pub use sequences::sequence_hash;

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::{CommitAuthor, StorageConfig};
use crate::error::{EntityKind, FsError, StoreError};
use crate::fs;
use crate::ids::Sha;
use crate::locks::ProjectLocks;
use crate::paths::FilePaths;
use crate::validation::{BasicValidator, ModelValidator};
use crate::versioning::{self, VersioningError};

/// Where an entity stands, checked once and consumed by a single `match`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "sha")]
pub enum Presence {
    /// Nothing stored (or nothing at the requested version).
    Absent,
    /// Present in the working tree.
    Present,
    /// Present in the given commit.
    PresentAtVersion(Sha),
}

impl Presence {
    pub fn exists(&self) -> bool {
        !matches!(self, Presence::Absent)
    }
}

/// The storage engine.
pub struct Persistence {
    paths: FilePaths,
    author: CommitAuthor,
    validator: Box<dyn ModelValidator>,
    locks: ProjectLocks,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("root", &self.paths.root())
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

impl Persistence {
    /// A store using [`BasicValidator`].
    pub fn new(config: StorageConfig) -> Self {
        Self::with_validator(config, BasicValidator)
    }

    pub fn with_validator(config: StorageConfig, validator: impl ModelValidator + 'static) -> Self {
        Self {
            paths: FilePaths::new(config.storage_root),
            author: config.commit_author,
            validator: Box::new(validator),
            locks: ProjectLocks::new(),
        }
    }

    pub fn paths(&self) -> &FilePaths {
        &self.paths
    }

    fn validate(&self, entity: EntityKind, value: &Value) -> Result<(), StoreError> {
        let result = match entity {
            EntityKind::Project => self.validator.validate_project(value),
            EntityKind::Block => self.validator.validate_block(value),
            EntityKind::Order => self.validator.validate_order(value),
            EntityKind::Sequence | EntityKind::Permissions => Ok(()),
        };
        result.map_err(|reason| StoreError::invalid_model(entity, reason))
    }
}

/// Overwrite identity fields on a manifest. The caller's ids always win.
fn stamp(entity: EntityKind, mut content: Value, fields: &[(&str, &str)]) -> Result<Value, StoreError> {
    let Some(object) = content.as_object_mut() else {
        return Err(StoreError::invalid_model(
            entity,
            "manifest must be a JSON object",
        ));
    };
    for (key, value) in fields {
        object.insert((*key).to_string(), Value::String((*value).to_string()));
    }
    Ok(content)
}

/// Read a manifest from the working tree. `None` if the file is absent.
async fn read_manifest(path: &Path) -> Result<Option<Value>, StoreError> {
    match fs::read_json(path).await {
        Ok(value) => Ok(Some(value)),
        Err(FsError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a manifest as of `sha`. Every failure is a versioning error.
async fn read_versioned(repo_path: &Path, relative_path: &str, sha: &Sha) -> Result<Value, StoreError> {
    let text = versioning::checkout(repo_path, relative_path, sha).await?;
    serde_json::from_str(&text).map_err(|e| {
        StoreError::Versioning(VersioningError::Parse(format!(
            "{relative_path} at {sha} is not JSON: {e}"
        )))
    })
}
