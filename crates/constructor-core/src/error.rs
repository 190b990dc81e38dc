//! Error taxonomy shared by every storage operation.
//!
//! Callers branch on [`StoreError::kind`] rather than on error identity.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::versioning::VersioningError;

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Block,
    Order,
    Sequence,
    Permissions,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Project => "project",
            EntityKind::Block => "block",
            EntityKind::Order => "order",
            EntityKind::Sequence => "sequence",
            EntityKind::Permissions => "permissions",
        };
        f.write_str(label)
    }
}

/// Failures of the file system wrapper.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path),
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path),
            _ => FsError::Io { path, source },
        }
    }
}

/// Error type for every persistence operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} does not exist")]
    DoesNotExist { entity: EntityKind, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: EntityKind, id: String },

    #[error("invalid {entity} model: {reason}")]
    InvalidModel { entity: EntityKind, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Versioning(#[from] VersioningError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Comparable tag for [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DoesNotExist,
    AlreadyExists,
    InvalidModel,
    InvalidInput,
    Versioning,
    Io,
}

impl ErrorKind {
    /// HTTP status a route layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::DoesNotExist => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::InvalidModel | ErrorKind::InvalidInput => 400,
            ErrorKind::Versioning | ErrorKind::Io => 500,
        }
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::DoesNotExist { .. } => ErrorKind::DoesNotExist,
            StoreError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            StoreError::InvalidModel { .. } => ErrorKind::InvalidModel,
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::Versioning(_) => ErrorKind::Versioning,
            StoreError::Fs(FsError::NotFound(_)) => ErrorKind::DoesNotExist,
            StoreError::Fs(FsError::AlreadyExists(_)) => ErrorKind::AlreadyExists,
            StoreError::Fs(FsError::InvalidInput(_)) => ErrorKind::InvalidInput,
            StoreError::Fs(FsError::Io { .. }) => ErrorKind::Io,
        }
    }

    pub(crate) fn does_not_exist(entity: EntityKind, id: impl fmt::Display) -> Self {
        StoreError::DoesNotExist {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: EntityKind, id: impl fmt::Display) -> Self {
        StoreError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_model(entity: EntityKind, reason: impl Into<String>) -> Self {
        StoreError::InvalidModel {
            entity,
            reason: reason.into(),
        }
    }
}
