//! Explicit commits and history queries.

use super::Persistence;
use crate::commit_messages::{message_save, message_snapshot};
use crate::commit_messages::{parse_message, CommitKind};
use crate::error::{EntityKind, StoreError};
use crate::ids::{BlockId, ProjectId};
use crate::paths::block_manifest_relative;
use crate::versioning::{self, CommitRecord};

impl Persistence {
    /// Commit everything in the project's data directory.
    ///
    /// The caller must not already hold the project lock.
    async fn project_commit(
        &self,
        project_id: &ProjectId,
        message: String,
    ) -> Result<CommitRecord, StoreError> {
        let _guard = self.locks.acquire(project_id).await;
        self.require_project(project_id).await?;
        self.commit_locked(project_id, message).await
    }

    pub(super) async fn block_commit(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
        message: String,
    ) -> Result<CommitRecord, StoreError> {
        let _guard = self.locks.acquire(project_id).await;
        self.require_project(project_id).await?;
        if !self.block_exists(block_id, project_id, None).await? {
            return Err(StoreError::does_not_exist(EntityKind::Block, block_id));
        }
        self.commit_locked(project_id, message).await
    }

    async fn commit_locked(
        &self,
        project_id: &ProjectId,
        message: String,
    ) -> Result<CommitRecord, StoreError> {
        let repo = self.paths.project_data_path(project_id);
        let sha = versioning::commit(&repo, &message, &self.author).await?;
        let record = versioning::get_commit(&repo, &sha).await?;

        log::info!("Committed {} in project {project_id}: {message}", record.sha);
        Ok(record)
    }

    /// Autosave: commit the project's current state with a `SAVE` message.
    pub async fn project_save(
        &self,
        project_id: &ProjectId,
        addition: Option<&str>,
    ) -> Result<CommitRecord, StoreError> {
        self.project_commit(project_id, message_save(project_id, addition))
            .await
    }

    /// User-requested checkpoint, listed by [`Persistence::project_snapshots`].
    pub async fn project_snapshot(
        &self,
        project_id: &ProjectId,
        addition: Option<&str>,
    ) -> Result<CommitRecord, StoreError> {
        self.project_commit(project_id, message_snapshot(project_id, addition))
            .await
    }

    /// Every commit of the project, newest first.
    pub async fn project_history(&self, project_id: &ProjectId) -> Result<Vec<CommitRecord>, StoreError> {
        self.require_project(project_id).await?;
        let repo = self.paths.project_data_path(project_id);
        Ok(versioning::history(&repo, None).await?)
    }

    /// Only the commits made by [`Persistence::project_snapshot`].
    pub async fn project_snapshots(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        let snapshots = self
            .project_history(project_id)
            .await?
            .into_iter()
            .filter(|record| {
                parse_message(&record.message).is_some_and(|m| m.kind == CommitKind::Snapshot)
            })
            .collect();
        Ok(snapshots)
    }

    /// Commits that touched the block's manifest, newest first.
    pub async fn block_history(
        &self,
        block_id: &BlockId,
        project_id: &ProjectId,
    ) -> Result<Vec<CommitRecord>, StoreError> {
        self.require_project(project_id).await?;
        let repo = self.paths.project_data_path(project_id);
        let relative = block_manifest_relative(block_id);
        Ok(versioning::history(&repo, Some(&relative)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{bid, pid, store, store_with_project};
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn save_records_a_save_message() {
        let (_dir, store) = store_with_project().await;
        let record = store.project_save(&pid("p1"), Some("autosave")).await.unwrap();

        assert_eq!(record.message, "[SAVE] p1: autosave");
        assert_eq!(record.parent_sha, None);
    }

    #[tokio::test]
    async fn commits_are_allowed_without_changes() {
        let (_dir, store) = store_with_project().await;
        let first = store.project_save(&pid("p1"), None).await.unwrap();
        let second = store.project_save(&pid("p1"), None).await.unwrap();

        assert_ne!(first.sha, second.sha);
        assert_eq!(second.parent_sha.as_ref(), Some(&first.sha));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_snapshots_are_filtered() {
        let (_dir, store) = store_with_project().await;
        store.project_save(&pid("p1"), None).await.unwrap();
        let snap = store.project_snapshot(&pid("p1"), Some("v1")).await.unwrap();
        let last = store.project_save(&pid("p1"), None).await.unwrap();

        let history = store.project_history(&pid("p1")).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].sha, last.sha);

        let snapshots = store.project_snapshots(&pid("p1")).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].sha, snap.sha);
        assert_eq!(snapshots[0].message, "[SNAPSHOT] p1: v1");
    }

    #[tokio::test]
    async fn new_project_has_empty_history() {
        let (_dir, store) = store_with_project().await;
        assert!(store.project_history(&pid("p1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn block_history_only_lists_commits_touching_the_block() {
        let (_dir, store) = store_with_project().await;
        store.project_save(&pid("p1"), None).await.unwrap();
        store
            .block_write(&bid("b1"), json!({}), &pid("p1"))
            .await
            .unwrap();
        let touched = store.project_save(&pid("p1"), None).await.unwrap();
        store.project_save(&pid("p1"), None).await.unwrap();

        let history = store.block_history(&bid("b1"), &pid("p1")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sha, touched.sha);
    }

    #[tokio::test]
    async fn save_on_missing_project_fails() {
        let (_dir, store) = store();
        let err = store.project_save(&pid("p1"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }
}
