//! In-memory record store (single-instance, lost on restart)

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendKind, RecordStore, StoreError, StoreResult, StoreStats};
use crate::models::date_entry::{DateEntry, DateEntryPatch};
use crate::models::user::User;

/// Tables are plain vectors so that listing preserves insertion order.
/// Lookups are linear scans; one user's dating log stays small.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    dates: RwLock<Vec<DateEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        Ok(StoreStats {
            users: self.users.read().await.len() as u64,
            dates: self.dates.read().await.len() as u64,
        })
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        // Uniqueness is checked under the write lock so two concurrent
        // registrations cannot both succeed.
        let mut users = self.users.write().await;
        if let Some(existing) = users.iter().find(|u| {
            u.id == user.id || u.email == user.email || u.username == user.username
        }) {
            let key = if existing.id == user.id {
                "users.id"
            } else if existing.email == user.email {
                "users.email"
            } else {
                "users.username"
            };
            return Err(StoreError::DuplicateKey(key.into()));
        }
        users.push(user.clone());
        tracing::debug!(user_id = %user.id, total = users.len(), "User stored in memory");
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_date(&self, entry: DateEntry) -> StoreResult<DateEntry> {
        let mut dates = self.dates.write().await;
        if dates.iter().any(|d| d.id == entry.id) {
            return Err(StoreError::DuplicateKey("dates.id".into()));
        }
        dates.push(entry.clone());
        Ok(entry)
    }

    async fn date_by_id(&self, id: Uuid) -> StoreResult<Option<DateEntry>> {
        Ok(self.dates.read().await.iter().find(|d| d.id == id).cloned())
    }

    async fn dates_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<DateEntry>> {
        Ok(self
            .dates
            .read()
            .await
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_date(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &DateEntryPatch,
    ) -> StoreResult<Option<DateEntry>> {
        let mut dates = self.dates.write().await;
        let Some(entry) = dates
            .iter_mut()
            .find(|d| d.id == id && d.owner_id == owner_id)
        else {
            return Ok(None);
        };
        patch.apply(entry);
        Ok(Some(entry.clone()))
    }

    async fn remove_date(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let mut dates = self.dates.write().await;
        let before = dates.len();
        dates.retain(|d| !(d.id == id && d.owner_id == owner_id));
        Ok(dates.len() < before)
    }
}
