//! Durable store with an in-memory fallback.
//!
//! When the primary fails (timeout, connection loss, database error) the
//! call is replayed against the memory store and a warning is logged every
//! time. Writes served this way are lost on restart and never reach the
//! primary. With `enabled = false` the failure is returned instead.
//! Duplicate-key rejections are answers, not failures, and pass through.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::{BackendKind, RecordStore, StoreResult, StoreStats};
use crate::models::date_entry::{DateEntry, DateEntryPatch};
use crate::models::user::User;

pub struct FallbackStore {
    primary: Arc<dyn RecordStore>,
    fallback: Arc<dyn RecordStore>,
    enabled: bool,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn RecordStore>, fallback: Arc<dyn RecordStore>, enabled: bool) -> Self {
        Self {
            primary,
            fallback,
            enabled,
        }
    }

    async fn degrade<T, P, F, PF, FF>(&self, op: &'static str, primary: P, fallback: F) -> StoreResult<T>
    where
        P: FnOnce(Arc<dyn RecordStore>) -> PF + Send,
        F: FnOnce(Arc<dyn RecordStore>) -> FF + Send,
        PF: Future<Output = StoreResult<T>> + Send,
        FF: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        match primary(self.primary.clone()).await {
            Err(e) if e.is_backend_failure() && self.enabled => {
                tracing::warn!(
                    op,
                    error = %e,
                    primary = ?self.primary.backend(),
                    "Primary store failed, serving from in-memory fallback; this result is NOT durable"
                );
                fallback(self.fallback.clone()).await
            }
            Err(e) if e.is_backend_failure() => {
                tracing::error!(op, error = %e, "Primary store failed and fallback is disabled");
                Err(e)
            }
            other => other,
        }
    }
}

#[async_trait]
impl RecordStore for FallbackStore {
    fn backend(&self) -> BackendKind {
        self.primary.backend()
    }

    /// Readiness reflects the primary only.
    async fn ping(&self) -> StoreResult<()> {
        self.primary.ping().await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.degrade(
            "stats",
            |s| async move { s.stats().await },
            |s| async move { s.stats().await },
        )
        .await
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let copy = user.clone();
        self.degrade(
            "insert_user",
            |s| async move { s.insert_user(user).await },
            |s| async move { s.insert_user(copy).await },
        )
        .await
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.degrade(
            "user_by_id",
            |s| async move { s.user_by_id(id).await },
            |s| async move { s.user_by_id(id).await },
        )
        .await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_string();
        let copy = email.clone();
        self.degrade(
            "user_by_email",
            |s| async move { s.user_by_email(&email).await },
            |s| async move { s.user_by_email(&copy).await },
        )
        .await
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_string();
        let copy = username.clone();
        self.degrade(
            "user_by_username",
            |s| async move { s.user_by_username(&username).await },
            |s| async move { s.user_by_username(&copy).await },
        )
        .await
    }

    async fn insert_date(&self, entry: DateEntry) -> StoreResult<DateEntry> {
        let copy = entry.clone();
        self.degrade(
            "insert_date",
            |s| async move { s.insert_date(entry).await },
            |s| async move { s.insert_date(copy).await },
        )
        .await
    }

    async fn date_by_id(&self, id: Uuid) -> StoreResult<Option<DateEntry>> {
        self.degrade(
            "date_by_id",
            |s| async move { s.date_by_id(id).await },
            |s| async move { s.date_by_id(id).await },
        )
        .await
    }

    async fn dates_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<DateEntry>> {
        self.degrade(
            "dates_by_owner",
            |s| async move { s.dates_by_owner(owner_id).await },
            |s| async move { s.dates_by_owner(owner_id).await },
        )
        .await
    }

    async fn update_date(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &DateEntryPatch,
    ) -> StoreResult<Option<DateEntry>> {
        let patch = patch.clone();
        let copy = patch.clone();
        self.degrade(
            "update_date",
            |s| async move { s.update_date(id, owner_id, &patch).await },
            |s| async move { s.update_date(id, owner_id, &copy).await },
        )
        .await
    }

    async fn remove_date(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        self.degrade(
            "remove_date",
            |s| async move { s.remove_date(id, owner_id).await },
            |s| async move { s.remove_date(id, owner_id).await },
        )
        .await
    }
}
