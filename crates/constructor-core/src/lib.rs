//! # constructor-core
//!
//! Storage engine for Genetic Constructor projects.
//!
//! Projects, blocks and orders are JSON manifests on disk. Each project's
//! data directory is a git repository, so earlier versions of a manifest
//! can be read back by commit sha. Sequences are stored once, keyed by the
//! MD5 of their content, and shared across projects.
//!
//! ## Key Concepts
//!
//! - **Persistence**: the entry point; all entity operations hang off it
//! - **Presence**: absent, present, or present at a given commit
//! - **Soft delete**: a deleted project keeps its data and history, only its
//!   permissions record is archived
//!
//! ## Layout
//!
//! ```text
//! <root>/projects/<projectId>/permissions.json
//! <root>/projects/<projectId>/orders/<orderId>.json
//! <root>/projects/<projectId>/data/project.json
//! <root>/projects/<projectId>/data/blocks/<blockId>/block.json
//! <root>/sequences/<md5>
//! ```

pub mod commit_messages;
pub mod config;
pub mod error;
pub mod fs;
pub mod ids;
pub mod locks;
pub mod merge;
pub mod paths;
pub mod permissions;
pub mod persistence;
pub mod validation;
pub mod versioning;

// Re-export commonly used types
pub use config::{CommitAuthor, StorageConfig};
pub use error::{EntityKind, ErrorKind, StoreError};
pub use ids::{BlockId, OrderId, ProjectId, SequenceHash, Sha, UserId};
pub use persistence::{sequence_hash, Persistence, Presence};
pub use validation::{BasicValidator, ModelValidator};
pub use versioning::CommitRecord;
