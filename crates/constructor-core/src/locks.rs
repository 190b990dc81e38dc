//! Per-project serialization of create and commit operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::ids::ProjectId;

/// One async mutex per project, created on first use.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<ProjectId, Arc<AsyncMutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `project_id`.
    ///
    /// Entries nobody holds or waits on are dropped here, so the map only
    /// tracks projects currently in use.
    pub async fn acquire(&self, project_id: &ProjectId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(project_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked projects, including idle ones not yet pruned.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_project_is_serialized() {
        let locks = Arc::new(ProjectLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let project = ProjectId::parse("p1").unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let project = project.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&project).await;
                assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_projects_do_not_block() {
        let locks = ProjectLocks::new();
        let _a = locks.acquire(&ProjectId::parse("p1").unwrap()).await;
        let _b = locks.acquire(&ProjectId::parse("p2").unwrap()).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = ProjectLocks::new();
        for i in 0..10 {
            let _guard = locks.acquire(&ProjectId::parse(format!("p{i}")).unwrap()).await;
        }
        assert_eq!(locks.len(), 1);

        let held = locks.acquire(&ProjectId::parse("held").unwrap()).await;
        let _other = locks.acquire(&ProjectId::parse("other").unwrap()).await;
        assert_eq!(locks.len(), 2);
        drop(held);
    }
}
