//!
//! Profile document store
//! ----------------------
//! Keyed document store contract plus the file-backed implementation used by
//! the local deployment: one JSON document per profile under
//! `<root>/users/<uid>.json`, written atomically via tmp+rename.
//!
//! Key responsibilities:
//! - Get-by-key reads with a uid/key equality check on every document.
//! - Partial-update upserts that merge only the fields present in the patch.
//! - A filterable list query for the admin roster view (read-only consumer).

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};
use crate::profile::{ProfilePatch, ProfileRecord, Role};

/// Filter for the roster list query. `All` returns every profile; `ByRole`
/// narrows to one role; `ByGroup` to membership in a named group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFilter {
    All,
    ByRole(Role),
    ByGroup(String),
}

impl ProfileFilter {
    fn matches(&self, record: &ProfileRecord) -> bool {
        match self {
            ProfileFilter::All => true,
            ProfileFilter::ByRole(role) => record.role == *role,
            ProfileFilter::ByGroup(group) => record.groups.contains(group),
        }
    }
}

/// Keyed profile document store.
///
/// `set` is an upsert: an existing document is merged field-by-field with the
/// patch; an absent key is created from the patch, which must then carry at
/// least `email`. Records are never deleted through this contract.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, uid: &str) -> StoreResult<Option<ProfileRecord>>;
    async fn set(&self, uid: &str, patch: ProfilePatch) -> StoreResult<()>;
    async fn query(&self, filter: ProfileFilter) -> StoreResult<Vec<ProfileRecord>>;
}

/// File-backed profile store rooted at a data folder.
///
/// Usually shared as `Arc<dyn ProfileStore>`; all locking is delegated to the
/// filesystem since each document has exactly one writer role.
#[derive(Clone)]
pub struct FileProfileStore {
    root: PathBuf,
}

impl FileProfileStore {
    /// Create a store rooted at the given folder. The `users/` subfolder is
    /// created if missing.
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("users"))?;
        Ok(Self { root })
    }

    pub fn root_path(&self) -> &PathBuf {
        &self.root
    }

    fn doc_path(&self, uid: &str) -> PathBuf {
        self.root.join("users").join(format!("{}.json", uid))
    }

    fn read_doc(&self, uid: &str) -> StoreResult<Option<ProfileRecord>> {
        let path = self.doc_path(uid);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let record: ProfileRecord =
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                key: uid.to_string(),
                detail: e.to_string(),
            })?;
        if record.uid != uid {
            // Invariant violation: drop the document rather than serving it
            error!(
                target: "pursuva::profile",
                "key mismatch reading profile: key='{}' document uid='{}'", uid, record.uid
            );
            return Err(StoreError::KeyMismatch { key: uid.to_string(), found: record.uid });
        }
        Ok(Some(record))
    }

    fn write_doc(&self, record: &ProfileRecord) -> StoreResult<()> {
        let path = self.doc_path(&record.uid);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(record).map_err(|e| StoreError::Corrupt {
            key: record.uid.clone(),
            detail: e.to_string(),
        })?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        debug!(target: "pursuva::profile", "wrote profile document uid='{}'", record.uid);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn get(&self, uid: &str) -> StoreResult<Option<ProfileRecord>> {
        self.read_doc(uid)
    }

    async fn set(&self, uid: &str, patch: ProfilePatch) -> StoreResult<()> {
        match self.read_doc(uid)? {
            Some(mut record) => {
                patch.apply_to(&mut record);
                self.write_doc(&record)
            }
            None => {
                // Initial write: the patch must carry enough to build a document
                let Some(email) = patch.email.clone() else {
                    return Err(StoreError::MissingField { key: uid.to_string(), field: "email" });
                };
                let record = ProfileRecord {
                    uid: uid.to_string(),
                    email,
                    display_name: patch.display_name.clone(),
                    role: patch.role.unwrap_or(Role::Student),
                    groups: patch.groups.clone().unwrap_or_default(),
                    enrolled_courses: patch.enrolled_courses.clone().unwrap_or_default(),
                    created_at: Utc::now(),
                };
                self.write_doc(&record)
            }
        }
    }

    async fn query(&self, filter: ProfileFilter) -> StoreResult<Vec<ProfileRecord>> {
        let dir = self.root.join("users");
        if !dir.exists() {
            return Err(StoreError::Unavailable(format!("missing folder {}", dir.display())));
        }
        let mut out: Vec<ProfileRecord> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(uid) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            match self.read_doc(uid) {
                Ok(Some(record)) => {
                    if filter.matches(&record) {
                        out.push(record);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // One bad document does not fail the whole roster
                    error!(target: "pursuva::profile", "skipping unreadable profile '{}': {}", uid, e);
                }
            }
        }
        // Stable order for display and tests
        out.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn patch_full(email: &str, name: &str) -> ProfilePatch {
        ProfilePatch {
            email: Some(email.to_string()),
            display_name: Some(name.to_string()),
            role: Some(Role::Student),
            groups: None,
            enrolled_courses: Some(["python".to_string()].into_iter().collect()),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        store.set("u1", patch_full("u1@example.com", "User One")).await.unwrap();
        let rec = store.get("u1").await.unwrap().expect("record present");
        assert_eq!(rec.uid, "u1");
        assert_eq!(rec.role, Role::Student);
        assert!(rec.enrolled_courses.contains("python"));
    }

    #[tokio::test]
    async fn get_absent_key_is_none() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_without_email_is_rejected() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        let err = store.set("u1", ProfilePatch::role(Role::Admin)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField { field: "email", .. }));
    }

    #[tokio::test]
    async fn partial_update_preserves_other_fields() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        store.set("u1", patch_full("u1@example.com", "User One")).await.unwrap();
        store.set("u1", ProfilePatch::role(Role::Admin)).await.unwrap();
        let rec = store.get("u1").await.unwrap().unwrap();
        assert_eq!(rec.role, Role::Admin);
        assert_eq!(rec.email, "u1@example.com");
        assert!(rec.enrolled_courses.contains("python"));
    }

    #[tokio::test]
    async fn mismatched_uid_document_is_refused() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        store.set("u1", patch_full("u1@example.com", "User One")).await.unwrap();
        // Copy u1's document under a different key
        std::fs::copy(
            tmp.path().join("users").join("u1.json"),
            tmp.path().join("users").join("u2.json"),
        )
        .unwrap();
        let err = store.get("u2").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMismatch { .. }));
    }

    #[tokio::test]
    async fn query_filters_by_role() {
        let tmp = tempdir().unwrap();
        let store = FileProfileStore::new(tmp.path()).unwrap();
        store.set("u1", patch_full("u1@example.com", "User One")).await.unwrap();
        store.set("u2", patch_full("u2@example.com", "User Two")).await.unwrap();
        store.set("u2", ProfilePatch::role(Role::Admin)).await.unwrap();

        let all = store.query(ProfileFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        let admins = store.query(ProfileFilter::ByRole(Role::Admin)).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].uid, "u2");
    }
}
