//! Order operations.
//!
//! Orders are written once: there is no update path, and they are not
//! versioned.

use serde_json::Value;

use super::{read_manifest, stamp, Persistence};
use crate::error::{EntityKind, StoreError};
use crate::fs;
use crate::ids::{OrderId, ProjectId};

impl Persistence {
    pub async fn order_exists(
        &self,
        order_id: &OrderId,
        project_id: &ProjectId,
    ) -> Result<bool, StoreError> {
        Ok(fs::exists(&self.paths.order_manifest_path(order_id, project_id)).await?)
    }

    pub async fn order_get(
        &self,
        order_id: &OrderId,
        project_id: &ProjectId,
    ) -> Result<Option<Value>, StoreError> {
        read_manifest(&self.paths.order_manifest_path(order_id, project_id)).await
    }

    /// Write a new order.
    ///
    /// # Errors
    ///
    /// - `InvalidModel` if the manifest fails validation
    /// - `DoesNotExist` if the project is missing
    /// - `AlreadyExists` if the order was already written
    pub async fn order_write(
        &self,
        order_id: &OrderId,
        order: Value,
        project_id: &ProjectId,
    ) -> Result<Value, StoreError> {
        let order = stamp(
            EntityKind::Order,
            order,
            &[("id", order_id.as_str()), ("projectId", project_id.as_str())],
        )?;
        self.validate(EntityKind::Order, &order)?;

        let _guard = self.locks.acquire(project_id).await;
        self.require_project(project_id).await?;

        if self.order_exists(order_id, project_id).await? {
            return Err(StoreError::already_exists(EntityKind::Order, order_id));
        }

        fs::write_json(&self.paths.order_manifest_path(order_id, project_id), &order).await?;
        log::info!("Recorded order {order_id} for project {project_id}");
        Ok(order)
    }

    /// Remove an order's manifest.
    pub async fn order_delete(
        &self,
        order_id: &OrderId,
        project_id: &ProjectId,
    ) -> Result<OrderId, StoreError> {
        let _guard = self.locks.acquire(project_id).await;

        if !self.order_exists(order_id, project_id).await? {
            return Err(StoreError::does_not_exist(EntityKind::Order, order_id));
        }

        fs::delete(&self.paths.order_manifest_path(order_id, project_id)).await?;
        Ok(order_id.clone())
    }
}
