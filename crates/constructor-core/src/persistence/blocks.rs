//! Block operations.
//!
//! Blocks live inside their project's repository, so versioned block reads
//! use the project's history scoped to the block manifest path.

use serde_json::Value;

use super::{read_manifest, read_versioned, stamp, Persistence, Presence};
use crate::error::{EntityKind, StoreError};
use crate::fs;
use crate::ids::{BlockId, ProjectId, Sha};
use crate::merge::merged;
use crate::paths::block_manifest_relative;
use crate::versioning;

impl Persistence {
    pub async fn block_presence(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<Presence, StoreError> {
        match sha {
            Some(sha) => {
                let repo = self.paths.project_data_path(project_id);
                let relative = block_manifest_relative(block_id);
                if versioning::version_exists(&repo, sha, Some(&relative)).await? {
                    Ok(Presence::PresentAtVersion(sha.clone()))
                } else {
                    Ok(Presence::Absent)
                }
            }
            None => {
                let manifest = self.paths.block_manifest_path(block_id, project_id);
                if fs::exists(&manifest).await? {
                    Ok(Presence::Present)
                } else {
                    Ok(Presence::Absent)
                }
            }
        }
    }

    pub async fn block_exists(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<bool, StoreError> {
        Ok(self.block_presence(block_id, project_id, sha).await?.exists())
    }

    /// Read a block manifest, live or as of `sha`.
    pub async fn block_get(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<Option<Value>, StoreError> {
        match sha {
            Some(sha) => {
                let repo = self.paths.project_data_path(project_id);
                let block = read_versioned(&repo, &block_manifest_relative(block_id), sha).await?;
                Ok(Some(block))
            }
            None => read_manifest(&self.paths.block_manifest_path(block_id, project_id)).await,
        }
    }

    fn stamp_block(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
        block: Value,
    ) -> Result<Value, StoreError> {
        let block = stamp(
            EntityKind::Block,
            block,
            &[("id", block_id.as_str()), ("projectId", project_id.as_str())],
        )?;
        self.validate(EntityKind::Block, &block)?;
        Ok(block)
    }

    /// Blocks can only be written into a fully set-up project.
    pub(super) async fn require_project(&self, project_id: &ProjectId) -> Result<(), StoreError> {
        match self.project_presence(project_id, None).await? {
            Presence::Present | Presence::PresentAtVersion(_) => Ok(()),
            Presence::Absent => Err(StoreError::does_not_exist(EntityKind::Project, project_id)),
        }
    }

    /// Create a new block in an existing project.
    ///
    /// # Errors
    ///
    /// - `DoesNotExist` if the project is missing
    /// - `AlreadyExists` if the block already has a manifest
    /// - `InvalidModel` if the manifest fails validation
    pub async fn block_create(
        &self,
        block_id: &BlockId,
        block: Value,
        project_id: &ProjectId,
    ) -> Result<Value, StoreError> {
        let block = self.stamp_block(block_id, project_id, block)?;
        let _guard = self.locks.acquire(project_id).await;
        self.require_project(project_id).await?;

        match self.block_presence(block_id, project_id, None).await? {
            Presence::Absent => {}
            Presence::Present | Presence::PresentAtVersion(_) => {
                return Err(StoreError::already_exists(EntityKind::Block, block_id));
            }
        }

        fs::make_directory(&self.paths.block_path(block_id, project_id)).await?;
        fs::write_json(&self.paths.block_manifest_path(block_id, project_id), &block).await?;

        Ok(block)
    }

    /// Validate and write a block manifest; the first write creates the block.
    pub async fn block_write(
        &self,
        block_id: &BlockId,
        block: Value,
        project_id: &ProjectId,
    ) -> Result<Value, StoreError> {
        let block = self.stamp_block(block_id, project_id, block)?;
        let _guard = self.locks.acquire(project_id).await;
        self.require_project(project_id).await?;

        match self.block_presence(block_id, project_id, None).await? {
            Presence::Present | Presence::PresentAtVersion(_) => {}
            Presence::Absent => {
                fs::make_directory(&self.paths.block_path(block_id, project_id)).await?;
            }
        }

        fs::write_json(&self.paths.block_manifest_path(block_id, project_id), &block).await?;
        Ok(block)
    }

    /// Deep-merge `patch` into the current block and write the result.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` if the block has no manifest.
    pub async fn block_merge(
        &self,
        block_id: &BlockId,
        patch: &Value,
        project_id: &ProjectId,
    ) -> Result<Value, StoreError> {
        let current = self
            .block_get(block_id, project_id, None)
            .await?
            .ok_or_else(|| StoreError::does_not_exist(EntityKind::Block, block_id))?;

        self.block_write(block_id, merged(&current, patch), project_id)
            .await
    }

    /// Remove a block's directory. Not recoverable from the working tree;
    /// committed versions remain in history.
    pub async fn block_delete(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
    ) -> Result<BlockId, StoreError> {
        let _guard = self.locks.acquire(project_id).await;

        match self.block_presence(block_id, project_id, None).await? {
            Presence::Present | Presence::PresentAtVersion(_) => {}
            Presence::Absent => {
                return Err(StoreError::does_not_exist(EntityKind::Block, block_id));
            }
        }

        fs::delete_directory(&self.paths.block_path(block_id, project_id)).await?;
        log::debug!("Deleted block {block_id} from project {project_id}");
        Ok(block_id.clone())
    }
}
