use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::json_file::{read_json, write_json};
use super::models::{ChildProfile, ProfileUpdate, UserRecord};
use super::StoreError;

/// File-backed store of user records, one JSON file per user id.
///
/// Nothing is cached between calls: every operation re-reads the user's file.
/// Operations on the same user id are serialized within this process, so a
/// read-modify-write never interleaves with another one for that user.
/// Separate processes sharing the directory still race (last write wins).
pub struct ProfileStore {
    users_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProfileStore {
    pub fn new(users_dir: impl Into<PathBuf>) -> Self {
        Self {
            users_dir: users_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }

    /// Load a user's record, creating and persisting an empty one if the file
    /// is missing or unreadable as a record.
    pub async fn load_user(&self, uid: &str) -> Result<UserRecord, StoreError> {
        let path = self.user_path(uid)?;
        let _guard = self.lock_user(uid).await;
        self.load_or_create(uid, &path).await
    }

    /// Get one child's profile, creating it with defaults on first access.
    pub async fn get_child_profile(&self, uid: &str, child_id: &str) -> Result<ChildProfile, StoreError> {
        let path = self.user_path(uid)?;
        let _guard = self.lock_user(uid).await;

        let mut record = self.load_or_create(uid, &path).await?;
        if let Some(profile) = record.children.get(child_id) {
            return Ok(profile.clone());
        }

        let profile = ChildProfile::new(child_id);
        record.children.insert(child_id.to_string(), profile.clone());
        write_json(&path, &record).await?;
        tracing::info!("Created child profile '{}' for user '{}'", child_id, uid);

        Ok(profile)
    }

    /// Merge `update` into a child's profile and persist the whole record.
    pub async fn update_child_profile(
        &self,
        uid: &str,
        child_id: &str,
        update: ProfileUpdate,
    ) -> Result<ChildProfile, StoreError> {
        let path = self.user_path(uid)?;
        let _guard = self.lock_user(uid).await;

        let mut record = self.load_or_create(uid, &path).await?;
        let profile = record
            .children
            .entry(child_id.to_string())
            .or_insert_with(|| ChildProfile::new(child_id));
        profile.apply(update);
        let merged = profile.clone();

        write_json(&path, &record).await?;
        tracing::debug!("Updated child profile '{}' for user '{}'", child_id, uid);

        Ok(merged)
    }

    async fn load_or_create(&self, uid: &str, path: &Path) -> Result<UserRecord, StoreError> {
        match read_json::<Value>(path).await?.and_then(UserRecord::from_stored) {
            Some(mut record) => {
                record.uid = uid.to_string();
                record.fill_missing_nicknames();
                Ok(record)
            }
            None => {
                let record = UserRecord::new(uid);
                write_json(path, &record).await?;
                tracing::info!("Created user record for '{}'", uid);
                Ok(record)
            }
        }
    }

    fn user_path(&self, uid: &str) -> Result<PathBuf, StoreError> {
        let unsafe_name = uid.is_empty()
            || uid == "."
            || uid == ".."
            || uid.contains(|c| matches!(c, '/' | '\\' | '\0'));
        if unsafe_name {
            return Err(StoreError::InvalidUserId(uid.to_string()));
        }
        Ok(self.users_dir.join(format!("{}.json", uid)))
    }

    async fn lock_user(&self, uid: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(uid.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
