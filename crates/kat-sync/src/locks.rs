//! Per-project sync exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::error::SyncError;

/// Held for the duration of one project's sync.
#[derive(Debug)]
pub struct ProjectGuard {
    project_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl ProjectGuard {
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Registry of one async mutex per project id.
///
/// Entries are created on first use and kept for the life of the registry.
#[derive(Debug, Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, project_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(project_id.to_string()).or_default())
    }

    /// Wait until no other sync holds `project_id`.
    pub async fn lock(&self, project_id: &str) -> ProjectGuard {
        let guard = self.entry(project_id).lock_owned().await;
        ProjectGuard {
            project_id: project_id.to_string(),
            _guard: guard,
        }
    }

    /// Take `project_id` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] if another sync holds it.
    pub fn try_lock(&self, project_id: &str) -> Result<ProjectGuard, SyncError> {
        let guard = self
            .entry(project_id)
            .try_lock_owned()
            .map_err(|_| SyncError::AlreadyRunning {
                project_id: project_id.to_string(),
            })?;
        Ok(ProjectGuard {
            project_id: project_id.to_string(),
            _guard: guard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn second_try_lock_is_rejected() {
        let locks = ProjectLocks::new();
        let guard = locks.try_lock("prj-a").unwrap();
        assert_eq!(guard.project_id(), "prj-a");
        assert!(matches!(
            locks.try_lock("prj-a"),
            Err(SyncError::AlreadyRunning { ref project_id }) if project_id == "prj-a"
        ));
        drop(guard);
        assert!(locks.try_lock("prj-a").is_ok());
    }

    #[test]
    fn projects_lock_independently() {
        let locks = ProjectLocks::new();
        let _a = locks.try_lock("prj-a").unwrap();
        assert!(locks.try_lock("prj-b").is_ok());
    }

    #[tokio::test]
    async fn lock_waits_for_release() {
        let locks = Arc::new(ProjectLocks::new());
        let held = locks.try_lock("prj-a").unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.lock("prj-a").await.project_id().to_string() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap(), "prj-a");
    }
}
