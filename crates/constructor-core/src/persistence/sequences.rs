//! Content-addressed sequence storage.
//!
//! Sequences are shared by every project under the storage root and keyed
//! by the MD5 of their raw text. They are never versioned.

use super::Persistence;
use crate::commit_messages::message_sequence_update;
use crate::error::{EntityKind, FsError, StoreError};
use crate::fs;
use crate::ids::{BlockId, ProjectId, SequenceHash};
use crate::versioning::CommitRecord;

/// MD5 hex digest of raw sequence text.
pub fn sequence_hash(data: &str) -> SequenceHash {
    SequenceHash::of(data)
}

impl Persistence {
    pub async fn sequence_exists(&self, hash: &SequenceHash) -> Result<bool, StoreError> {
        Ok(fs::exists(&self.paths.sequence_path(hash)).await?)
    }

    /// Raw sequence text, or `None` if nothing is stored under `hash`.
    pub async fn sequence_get(&self, hash: &SequenceHash) -> Result<Option<String>, StoreError> {
        match fs::read_text(&self.paths.sequence_path(hash)).await {
            Ok(data) => Ok(Some(data)),
            Err(FsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store `data` under `hash`, overwriting any existing file.
    ///
    /// `owner` only annotates the log; writing a sequence never commits.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `hash` is not the digest of `data`.
    pub async fn sequence_write(
        &self,
        hash: &SequenceHash,
        data: &str,
        owner: Option<(&BlockId, &ProjectId)>,
    ) -> Result<SequenceHash, StoreError> {
        let actual = sequence_hash(data);
        if &actual != hash {
            return Err(StoreError::InvalidInput(format!(
                "sequence hash mismatch: expected {hash}, data hashes to {actual}"
            )));
        }

        fs::write_text(&self.paths.sequence_path(hash), data).await?;

        match owner {
            Some((block_id, project_id)) => {
                log::debug!("Stored sequence {hash} for block {block_id} in project {project_id}")
            }
            None => log::debug!("Stored sequence {hash}"),
        }
        Ok(hash.clone())
    }

    /// Hash `data` and store it.
    pub async fn sequence_store(&self, data: &str) -> Result<SequenceHash, StoreError> {
        let hash = sequence_hash(data);
        self.sequence_write(&hash, data, None).await
    }

    /// Delete a stored sequence.
    ///
    /// Sequences are not reference counted. Any block still pointing at
    /// `hash` is left dangling.
    pub async fn sequence_delete(&self, hash: &SequenceHash) -> Result<SequenceHash, StoreError> {
        log::warn!("Deleting sequence {hash}; blocks referencing it will dangle");

        match fs::delete(&self.paths.sequence_path(hash)).await {
            Ok(()) => Ok(hash.clone()),
            Err(FsError::NotFound(_)) => Err(StoreError::does_not_exist(EntityKind::Sequence, hash)),
            Err(e) => Err(e.into()),
        }
    }

    /// Record that `block_id` no longer carries a sequence.
    ///
    /// Commits the project with a `SEQUENCE <block>: removed` message.
    pub async fn sequence_remove(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
    ) -> Result<CommitRecord, StoreError> {
        let message = message_sequence_update(block_id, None);
        self.block_commit(block_id, project_id, message).await
    }
}
