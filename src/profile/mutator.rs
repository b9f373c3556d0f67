//! Role changes against the profile store, with an optimistic local roster.
//! The mutator is the only component that writes role fields. It never
//! fabricates a session transition for other principals: changing someone
//! else's role leaves the caller's own session untouched.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::profile::{ProfileFilter, ProfilePatch, ProfileRecord, ProfileStore, Role};

/// Result value for a mutation. Failures are data, not panics; the reason is
/// suitable for direct display in admin tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub ok: bool,
    pub reason: Option<String>,
}

impl MutationOutcome {
    pub fn success() -> Self {
        Self { ok: true, reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason.into()) }
    }
}

/// Performs role changes and keeps the admin roster (the display copy used by
/// the users page) consistent without waiting for a store round-trip.
pub struct ProfileMutator {
    store: Arc<dyn ProfileStore>,
    roster: RwLock<Vec<ProfileRecord>>,
}

impl ProfileMutator {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store, roster: RwLock::new(Vec::new()) }
    }

    /// Refresh the cached roster from the store (admin users page load).
    pub async fn load_roster(&self) -> MutationOutcome {
        match self.store.query(ProfileFilter::All).await {
            Ok(records) => {
                *self.roster.write() = records;
                MutationOutcome::success()
            }
            Err(e) => {
                warn!(target: "pursuva::profile", "roster load failed: {}", e);
                MutationOutcome::failed(format!("failed to load users: {}", e))
            }
        }
    }

    /// Snapshot of the cached roster for display.
    pub fn roster(&self) -> Vec<ProfileRecord> {
        self.roster.read().clone()
    }

    /// Cached copy of one profile, if the roster holds it.
    pub fn cached(&self, uid: &str) -> Option<ProfileRecord> {
        self.roster.read().iter().find(|r| r.uid == uid).cloned()
    }

    /// Change `target_uid`'s role with a single-field partial update.
    ///
    /// On success the cached roster entry is updated optimistically so the
    /// display does not serve a stale role until the next store read. On
    /// failure the cache is left untouched and a structured failure is
    /// returned; nothing is thrown across this boundary.
    pub async fn set_role(&self, target_uid: &str, new_role: Role) -> MutationOutcome {
        match self.store.set(target_uid, ProfilePatch::role(new_role)).await {
            Ok(()) => {
                info!(
                    target: "pursuva::profile",
                    "role updated uid='{}' role={}", target_uid, new_role
                );
                let mut roster = self.roster.write();
                if let Some(entry) = roster.iter_mut().find(|r| r.uid == target_uid) {
                    entry.role = new_role;
                }
                MutationOutcome::success()
            }
            Err(e) => {
                warn!(
                    target: "pursuva::profile",
                    "role update failed uid='{}': {}", target_uid, e
                );
                MutationOutcome::failed(format!("failed to update role: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FileProfileStore;
    use tempfile::tempdir;

    async fn seed(store: &FileProfileStore, uid: &str, email: &str) {
        store
            .set(
                uid,
                ProfilePatch {
                    email: Some(email.to_string()),
                    display_name: None,
                    role: Some(Role::Student),
                    groups: None,
                    enrolled_courses: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_role_updates_cache_without_store_round_trip() {
        let tmp = tempdir().unwrap();
        let store = Arc::new(FileProfileStore::new(tmp.path()).unwrap());
        seed(&store, "u1", "u1@example.com").await;

        let mutator = ProfileMutator::new(store.clone());
        assert!(mutator.load_roster().await.ok);
        assert_eq!(mutator.cached("u1").unwrap().role, Role::Student);

        let outcome = mutator.set_role("u1", Role::Admin).await;
        assert!(outcome.ok);
        // Cached copy reflects the write immediately
        assert_eq!(mutator.cached("u1").unwrap().role, Role::Admin);
        // And an independent store read is consistent with it
        let rec = store.get("u1").await.unwrap().unwrap();
        assert_eq!(rec.role, Role::Admin);
    }

    #[tokio::test]
    async fn set_role_for_absent_key_reports_failure_value() {
        let tmp = tempdir().unwrap();
        let store = Arc::new(FileProfileStore::new(tmp.path()).unwrap());
        let mutator = ProfileMutator::new(store);
        let outcome = mutator.set_role("ghost", Role::Admin).await;
        assert!(!outcome.ok);
        assert!(outcome.reason.unwrap().contains("failed to update role"));
    }
}
