//! Per-project access control.
//!
//! # File Format
//!
//! Stored as `permissions.json` next to the project's data directory:
//!
//! ```json
//! {
//!   "projectId": "project-1",
//!   "owner": "user-1",
//!   "users": ["user-1"],
//!   "createdAt": "2016-04-01T12:00:00Z"
//! }
//! ```
//!
//! Soft deletion moves this file to `priorOwner.json`. A project without a
//! permissions file is inaccessible to everyone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, FsError, StoreError};
use crate::fs;
use crate::ids::{ProjectId, UserId};
use crate::paths::FilePaths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPermissions {
    pub project_id: ProjectId,
    pub owner: UserId,
    /// Users allowed to read and write the project. Always includes the owner.
    pub users: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ProjectPermissions {
    pub fn new(project_id: ProjectId, owner: UserId) -> Self {
        Self {
            project_id,
            users: vec![owner.clone()],
            owner,
            created_at: Utc::now(),
        }
    }

    pub fn allows(&self, user_id: &UserId) -> bool {
        self.owner == *user_id || self.users.contains(user_id)
    }
}

/// Write a permissions record granting `user_id` ownership of the project.
pub async fn create_project_permissions(
    paths: &FilePaths,
    project_id: &ProjectId,
    user_id: &UserId,
) -> Result<ProjectPermissions, StoreError> {
    let permissions = ProjectPermissions::new(project_id.clone(), user_id.clone());
    fs::write_json(&paths.project_permissions_path(project_id), &permissions).await?;
    Ok(permissions)
}

/// Read a project's permissions. `None` if the project has none (or was deleted).
pub async fn read_project_permissions(
    paths: &FilePaths,
    project_id: &ProjectId,
) -> Result<Option<ProjectPermissions>, StoreError> {
    match fs::read_json(&paths.project_permissions_path(project_id)).await {
        Ok(permissions) => Ok(Some(permissions)),
        Err(FsError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Add a user to an existing permissions record.
pub async fn grant_project_access(
    paths: &FilePaths,
    project_id: &ProjectId,
    user_id: &UserId,
) -> Result<ProjectPermissions, StoreError> {
    let mut permissions = read_project_permissions(paths, project_id)
        .await?
        .ok_or_else(|| StoreError::does_not_exist(EntityKind::Permissions, project_id))?;

    if !permissions.users.contains(user_id) {
        permissions.users.push(user_id.clone());
        fs::write_json(&paths.project_permissions_path(project_id), &permissions).await?;
    }

    Ok(permissions)
}

pub async fn user_has_access(
    paths: &FilePaths,
    project_id: &ProjectId,
    user_id: &UserId,
) -> Result<bool, StoreError> {
    Ok(read_project_permissions(paths, project_id)
        .await?
        .is_some_and(|p| p.allows(user_id)))
}

/// List every project `user_id` can access, skipping deleted projects.
pub async fn list_projects_with_access(
    paths: &FilePaths,
    user_id: &UserId,
) -> Result<Vec<ProjectId>, StoreError> {
    let mut projects = Vec::new();

    for name in fs::list_directories(&paths.projects_root()).await? {
        let Ok(project_id) = ProjectId::parse(name.as_str()) else {
            log::warn!("Skipping unexpected directory in projects root: {name}");
            continue;
        };
        if user_has_access(paths, &project_id, user_id).await? {
            projects.push(project_id);
        }
    }

    Ok(projects)
}
