//! Record store: persistence for users and date entries.
//!
//! One trait, three implementations:
//! - [`MemoryStore`]: process-local tables, used when no database is configured
//! - [`PgStore`]: Postgres via sqlx, every call bounded by a timeout
//! - [`FallbackStore`]: Postgres first, memory when Postgres fails
//!
//! The backend is chosen once at startup by [`connect`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::models::date_entry::{DateEntry, DateEntryPatch};
use crate::models::user::User;

pub mod fallback;
pub mod memory;
pub mod postgres;

pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Failures of the medium itself, as opposed to a rejected write.
    pub fn is_backend_failure(&self) -> bool {
        !matches!(self, StoreError::DuplicateKey(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub users: u64,
    pub dates: u64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Cheap reachability check used by `/readyz`.
    async fn ping(&self) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<StoreStats>;

    // ── Users ───────────────────────────────────────────────────────────

    /// Fails with `DuplicateKey` if the id, email or username is taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // ── Date entries ────────────────────────────────────────────────────

    async fn insert_date(&self, entry: DateEntry) -> StoreResult<DateEntry>;
    /// Global primary-key lookup, not scoped to an owner.
    async fn date_by_id(&self, id: Uuid) -> StoreResult<Option<DateEntry>>;
    /// Entries of one owner in insertion order.
    async fn dates_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<DateEntry>>;
    /// `None` when no entry matches both `id` and `owner_id`.
    async fn update_date(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &DateEntryPatch,
    ) -> StoreResult<Option<DateEntry>>;
    async fn remove_date(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;
}

/// Pick the backend for this process.
pub async fn connect(config: &Config) -> Arc<dyn RecordStore> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!(backend = "memory", "DATABASE_URL not set, using in-memory store");
        return Arc::new(MemoryStore::new());
    };

    match PgStore::connect(url, config.store_timeout).await {
        Ok(pg) => {
            tracing::info!(
                backend = "postgres",
                fallback = config.store_fallback,
                "Using Postgres store"
            );
            Arc::new(FallbackStore::new(
                Arc::new(pg),
                Arc::new(MemoryStore::new()),
                config.store_fallback,
            ))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                backend = "memory",
                "Postgres unreachable at startup, using in-memory store; data will not survive a restart"
            );
            Arc::new(MemoryStore::new())
        }
    }
}
