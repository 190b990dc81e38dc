//! Project operations.

use serde_json::Value;

use super::{read_manifest, read_versioned, stamp, Persistence, Presence};
use crate::error::{EntityKind, FsError, StoreError};
use crate::fs;
use crate::ids::{ProjectId, Sha, UserId};
use crate::merge::merged;
use crate::paths::project_manifest_relative;
use crate::permissions;
use crate::versioning;

impl Persistence {
    // ------------------------------------------------------------------------
    // Existence and reads
    // ------------------------------------------------------------------------

    pub async fn project_presence(
        &self,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<Presence, StoreError> {
        match sha {
            Some(sha) => {
                let repo = self.paths.project_data_path(project_id);
                let relative = project_manifest_relative();
                if versioning::version_exists(&repo, sha, Some(&relative)).await? {
                    Ok(Presence::PresentAtVersion(sha.clone()))
                } else {
                    Ok(Presence::Absent)
                }
            }
            None => {
                let manifest = self.paths.project_manifest_path(project_id);
                if fs::exists(&manifest).await? {
                    Ok(Presence::Present)
                } else {
                    Ok(Presence::Absent)
                }
            }
        }
    }

    pub async fn project_exists(
        &self,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<bool, StoreError> {
        Ok(self.project_presence(project_id, sha).await?.exists())
    }

    /// Read a project manifest, live or as of `sha`.
    ///
    /// Returns `Ok(None)` for a missing project when no version is requested.
    /// Versioned reads of anything that is not in the repository fail.
    pub async fn project_get(
        &self,
        project_id: &ProjectId,
        sha: Option<&Sha>,
    ) -> Result<Option<Value>, StoreError> {
        match sha {
            Some(sha) => {
                let repo = self.paths.project_data_path(project_id);
                let project = read_versioned(&repo, &project_manifest_relative(), sha).await?;
                Ok(Some(project))
            }
            None => read_manifest(&self.paths.project_manifest_path(project_id)).await,
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Scaffold directories, permissions and repository.
    ///
    /// On failure the partial scaffold is removed; the project never counts
    /// as existing because its manifest has not been written.
    async fn project_setup(&self, project_id: &ProjectId, user_id: &UserId) -> Result<(), StoreError> {
        match self.project_setup_steps(project_id, user_id).await {
            Ok(()) => {
                log::info!("Set up project {project_id} for {user_id}");
                Ok(())
            }
            Err(err) => {
                log::warn!("Setup of project {project_id} failed: {err}");
                let project_path = self.paths.project_path(project_id);
                if let Err(cleanup) = fs::delete_directory(&project_path).await {
                    log::warn!("Could not remove partial project {project_id}: {cleanup}");
                }
                Err(err)
            }
        }
    }

    async fn project_setup_steps(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        let data_path = self.paths.project_data_path(project_id);

        fs::make_directory(&self.paths.project_path(project_id)).await?;
        fs::make_directory(&data_path).await?;
        fs::make_directory(&self.paths.order_directory_path(project_id)).await?;
        fs::make_directory(&self.paths.block_directory_path(project_id)).await?;
        permissions::create_project_permissions(&self.paths, project_id, user_id).await?;

        // A repository left by an interrupted setup is reused.
        if !versioning::is_git_repo(&data_path) {
            versioning::initialize(&data_path).await?;
        }
        Ok(())
    }

    fn stamp_project(&self, project_id: &ProjectId, project: Value) -> Result<Value, StoreError> {
        let project = stamp(EntityKind::Project, project, &[("id", project_id.as_str())])?;
        self.validate(EntityKind::Project, &project)?;
        Ok(project)
    }

    // ------------------------------------------------------------------------
    // Create / write / merge
    // ------------------------------------------------------------------------

    /// Create a new project owned by `user_id`.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the project has a manifest
    /// - `InvalidModel` if the manifest fails validation
    pub async fn project_create(
        &self,
        project_id: &ProjectId,
        project: Value,
        user_id: &UserId,
    ) -> Result<Value, StoreError> {
        let project = self.stamp_project(project_id, project)?;
        let _guard = self.locks.acquire(project_id).await;

        match self.project_presence(project_id, None).await? {
            Presence::Absent => {}
            Presence::Present | Presence::PresentAtVersion(_) => {
                return Err(StoreError::already_exists(EntityKind::Project, project_id));
            }
        }

        self.project_setup(project_id, user_id).await?;
        fs::write_json(&self.paths.project_manifest_path(project_id), &project).await?;

        Ok(project)
    }

    /// Validate and write a project manifest, setting the project up first if needed.
    ///
    /// # Errors
    ///
    /// - `InvalidModel` if the manifest fails validation (nothing is written)
    /// - `InvalidInput` if the project must be set up and no owner was given
    pub async fn project_write(
        &self,
        project_id: &ProjectId,
        project: Value,
        user_id: Option<&UserId>,
    ) -> Result<Value, StoreError> {
        let project = self.stamp_project(project_id, project)?;
        let _guard = self.locks.acquire(project_id).await;

        match self.project_presence(project_id, None).await? {
            Presence::Present | Presence::PresentAtVersion(_) => {}
            Presence::Absent => {
                let user_id = user_id.ok_or_else(|| {
                    StoreError::InvalidInput(format!(
                        "an owner is required to create project {project_id}"
                    ))
                })?;
                self.project_setup(project_id, user_id).await?;
            }
        }

        fs::write_json(&self.paths.project_manifest_path(project_id), &project).await?;
        Ok(project)
    }

    /// Deep-merge `patch` into the current manifest and write the result.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` if the project has no manifest.
    pub async fn project_merge(
        &self,
        project_id: &ProjectId,
        patch: &Value,
        user_id: Option<&UserId>,
    ) -> Result<Value, StoreError> {
        let current = self
            .project_get(project_id, None)
            .await?
            .ok_or_else(|| StoreError::does_not_exist(EntityKind::Project, project_id))?;

        self.project_write(project_id, merged(&current, patch), user_id)
            .await
    }

    // ------------------------------------------------------------------------
    // Delete / restore
    // ------------------------------------------------------------------------

    /// Soft-delete a project.
    ///
    /// The permissions file is moved to `priorOwner.json`. The manifest and
    /// history stay on disk, so the project can be restored.
    pub async fn project_delete(&self, project_id: &ProjectId) -> Result<ProjectId, StoreError> {
        let _guard = self.locks.acquire(project_id).await;

        if !self.project_presence(project_id, None).await?.exists() {
            return Err(StoreError::does_not_exist(EntityKind::Project, project_id));
        }

        let permissions_path = self.paths.project_permissions_path(project_id);
        let contents = match fs::read_text(&permissions_path).await {
            Ok(contents) => contents,
            Err(FsError::NotFound(_)) => {
                return Err(StoreError::does_not_exist(EntityKind::Permissions, project_id));
            }
            Err(e) => return Err(e.into()),
        };

        // Archive first: a failed archive write must leave the project accessible.
        fs::write_text(&self.paths.project_prior_owner_path(project_id), &contents).await?;
        fs::delete(&permissions_path).await?;

        log::info!("Soft-deleted project {project_id}");
        Ok(project_id.clone())
    }

    /// Undo [`Persistence::project_delete`] by moving the archived permissions back.
    ///
    /// # Errors
    ///
    /// - `DoesNotExist` if the project or its archived permissions are missing
    /// - `AlreadyExists` if the project still has live permissions
    pub async fn project_restore(&self, project_id: &ProjectId) -> Result<ProjectId, StoreError> {
        let _guard = self.locks.acquire(project_id).await;

        if !self.project_presence(project_id, None).await?.exists() {
            return Err(StoreError::does_not_exist(EntityKind::Project, project_id));
        }

        let permissions_path = self.paths.project_permissions_path(project_id);
        if fs::exists(&permissions_path).await? {
            return Err(StoreError::already_exists(EntityKind::Permissions, project_id));
        }

        let prior_path = self.paths.project_prior_owner_path(project_id);
        let contents = match fs::read_text(&prior_path).await {
            Ok(contents) => contents,
            Err(FsError::NotFound(_)) => {
                return Err(StoreError::does_not_exist(EntityKind::Permissions, project_id));
            }
            Err(e) => return Err(e.into()),
        };

        fs::write_text(&permissions_path, &contents).await?;
        fs::delete(&prior_path).await?;

        log::info!("Restored project {project_id}");
        Ok(project_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::{owner, pid, store, store_with_project};
    use super::*;
    use crate::error::ErrorKind;
    use crate::ids::UserId;
    use serde_json::json;

    #[tokio::test]
    async fn create_stamps_id_and_round_trips() {
        let (_dir, store) = store();
        let created = store
            .project_create(&pid("p1"), json!({"id": "ignored", "components": []}), &owner())
            .await
            .unwrap();

        assert_eq!(created["id"], "p1");
        assert_eq!(store.project_get(&pid("p1"), None).await.unwrap(), Some(created));
        assert!(store.project_exists(&pid("p1"), None).await.unwrap());
        assert!(versioning::is_git_repo(&store.paths().project_data_path(&pid("p1"))));
    }

    #[tokio::test]
    async fn create_is_assert_new() {
        let (_dir, store) = store_with_project().await;
        let err = store
            .project_create(&pid("p1"), json!({}), &owner())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn missing_project_reads_as_none() {
        let (_dir, store) = store();
        assert_eq!(store.project_get(&pid("nope"), None).await.unwrap(), None);
        assert_eq!(
            store.project_presence(&pid("nope"), None).await.unwrap(),
            Presence::Absent
        );
    }

    #[tokio::test]
    async fn unknown_version_is_an_error_not_none() {
        let (_dir, store) = store_with_project().await;
        let sha = Sha::parse("deadbeef").unwrap();

        let err = store.project_get(&pid("p1"), Some(&sha)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Versioning);
        assert!(!store.project_exists(&pid("p1"), Some(&sha)).await.unwrap());
    }

    #[tokio::test]
    async fn versioned_read_sees_committed_state() {
        let (_dir, store) = store_with_project().await;
        let saved = store.project_save(&pid("p1"), None).await.unwrap();

        store
            .project_write(&pid("p1"), json!({"metadata": {"name": "renamed"}}), None)
            .await
            .unwrap();

        let old = store.project_get(&pid("p1"), Some(&saved.sha)).await.unwrap().unwrap();
        let live = store.project_get(&pid("p1"), None).await.unwrap().unwrap();
        assert_eq!(old["metadata"]["name"], "demo");
        assert_eq!(live["metadata"]["name"], "renamed");
        assert_eq!(
            store.project_presence(&pid("p1"), Some(&saved.sha)).await.unwrap(),
            Presence::PresentAtVersion(saved.sha.clone())
        );
    }

    #[tokio::test]
    async fn first_write_needs_an_owner() {
        let (_dir, store) = store();
        let err = store
            .project_write(&pid("p1"), json!({}), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!store.paths().project_path(&pid("p1")).exists());

        store
            .project_write(&pid("p1"), json!({}), Some(&owner()))
            .await
            .unwrap();
        assert!(permissions::user_has_access(store.paths(), &pid("p1"), &owner())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn invalid_model_leaves_storage_untouched() {
        let (_dir, store) = store();
        let err = store
            .project_write(&pid("p1"), json!({"components": "b1"}), Some(&owner()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidModel);
        assert!(!store.paths().project_path(&pid("p1")).exists());

        let (_dir, store) = store_with_project().await;
        let before = store.project_get(&pid("p1"), None).await.unwrap();
        let err = store
            .project_write(&pid("p1"), json!([1, 2]), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidModel);
        assert_eq!(store.project_get(&pid("p1"), None).await.unwrap(), before);
    }

    #[tokio::test]
    async fn merge_is_deep_and_replaces_arrays() {
        let (_dir, store) = store();
        store
            .project_create(
                &pid("p1"),
                json!({"metadata": {"name": "a", "tags": ["x", "y"]}, "components": ["b1"]}),
                &owner(),
            )
            .await
            .unwrap();

        let merged = store
            .project_merge(&pid("p1"), &json!({"metadata": {"tags": ["z"]}, "id": "evil"}), None)
            .await
            .unwrap();

        assert_eq!(
            merged,
            json!({"id": "p1", "metadata": {"name": "a", "tags": ["z"]}, "components": ["b1"]})
        );
    }

    #[tokio::test]
    async fn merge_into_missing_project_fails() {
        let (_dir, store) = store();
        let err = store
            .project_merge(&pid("p1"), &json!({"a": 1}), Some(&owner()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }

    #[tokio::test]
    async fn soft_delete_and_restore() {
        let (_dir, store) = store_with_project().await;
        let paths = store.paths();

        assert_eq!(store.project_delete(&pid("p1")).await.unwrap(), pid("p1"));
        assert!(store.project_exists(&pid("p1"), None).await.unwrap());
        assert!(!paths.project_permissions_path(&pid("p1")).exists());
        assert!(paths.project_prior_owner_path(&pid("p1")).exists());
        assert!(!permissions::user_has_access(paths, &pid("p1"), &owner()).await.unwrap());

        let err = store.project_delete(&pid("p1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);

        store.project_restore(&pid("p1")).await.unwrap();
        assert!(permissions::user_has_access(paths, &pid("p1"), &owner()).await.unwrap());
        assert!(!paths.project_prior_owner_path(&pid("p1")).exists());

        let err = store.project_restore(&pid("p1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn failed_archive_keeps_permissions() {
        let (_dir, store) = store_with_project().await;
        let paths = store.paths();
        std::fs::create_dir_all(paths.project_prior_owner_path(&pid("p1"))).unwrap();

        let err = store.project_delete(&pid("p1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(paths.project_permissions_path(&pid("p1")).exists());
        assert!(permissions::user_has_access(paths, &pid("p1"), &owner()).await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_project_fails() {
        let (_dir, store) = store();
        let err = store.project_delete(&pid("p1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }

    #[tokio::test]
    async fn concurrent_creates_have_one_winner() {
        let (_dir, store) = store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for user in ["alice", "bob", "carol"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let user = UserId::parse(user).unwrap();
                store.project_create(&pid("p1"), json!({}), &user).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::AlreadyExists),
            }
        }
        assert_eq!(created, 1);
    }
}
