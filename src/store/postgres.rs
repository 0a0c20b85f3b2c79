//! Postgres record store. Every call is bounded by the configured timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BackendKind, RecordStore, StoreError, StoreResult, StoreStats};
use crate::models::date_entry::{DateEntry, DateEntryPatch};
use crate::models::user::User;

const USER_COLUMNS: &str =
    "id, email, username, password_hash, first_name, last_name, created_at";

const DATE_COLUMNS: &str = r#"
    id, owner_id, name, rating, chemistry_rating, attraction_rating,
    vibe_check, emotional_impact, conversation_quality, effort_level, body_language,
    green_flags, red_flags, notes, profile_image, image_analysis, date, created_at
"#;

pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Connect, then apply `migrations/`.
    pub async fn connect(database_url: &str, timeout: Duration) -> StoreResult<Self> {
        let pool = crate::db::create_pool(database_url, timeout)
            .await
            .map_err(map_sqlx)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migrations failed: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool, timeout })
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(map_sqlx),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{op} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::DuplicateKey(db.constraint().unwrap_or("unique").to_string());
        }
    }
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded(
            "ping",
            sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool),
        )
        .await
        .map(|_| ())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let (users, dates) = self
            .bounded(
                "stats",
                sqlx::query_as::<_, (i64, i64)>(
                    "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM date_entries)",
                )
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(StoreStats {
            users: users as u64,
            dates: dates as u64,
        })
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        self.bounded(
            "insert_user",
            sqlx::query_as::<_, User>(&sql)
                .bind(user.id)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.password_hash)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.created_at)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        self.bounded(
            "user_by_id",
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        self.bounded(
            "user_by_email",
            sqlx::query_as::<_, User>(&sql)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        self.bounded(
            "user_by_username",
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_date(&self, entry: DateEntry) -> StoreResult<DateEntry> {
        let sql = format!(
            r#"
            INSERT INTO date_entries (
                id, owner_id, name, rating, chemistry_rating, attraction_rating,
                vibe_check, emotional_impact, conversation_quality, effort_level, body_language,
                green_flags, red_flags, notes, profile_image, image_analysis, date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {DATE_COLUMNS}
            "#
        );
        self.bounded(
            "insert_date",
            sqlx::query_as::<_, DateEntry>(&sql)
                .bind(entry.id)
                .bind(entry.owner_id)
                .bind(&entry.name)
                .bind(entry.rating)
                .bind(entry.chemistry_rating)
                .bind(entry.attraction_rating)
                .bind(&entry.vibe_check)
                .bind(&entry.emotional_impact)
                .bind(&entry.conversation_quality)
                .bind(&entry.effort_level)
                .bind(&entry.body_language)
                .bind(&entry.green_flags)
                .bind(&entry.red_flags)
                .bind(&entry.notes)
                .bind(&entry.profile_image)
                .bind(&entry.image_analysis)
                .bind(&entry.date)
                .bind(entry.created_at)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn date_by_id(&self, id: Uuid) -> StoreResult<Option<DateEntry>> {
        let sql = format!("SELECT {DATE_COLUMNS} FROM date_entries WHERE id = $1");
        self.bounded(
            "date_by_id",
            sqlx::query_as::<_, DateEntry>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn dates_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<DateEntry>> {
        let sql = format!(
            "SELECT {DATE_COLUMNS} FROM date_entries WHERE owner_id = $1 ORDER BY seq ASC"
        );
        self.bounded(
            "dates_by_owner",
            sqlx::query_as::<_, DateEntry>(&sql)
                .bind(owner_id)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn update_date(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &DateEntryPatch,
    ) -> StoreResult<Option<DateEntry>> {
        let sql = format!(
            r#"
            UPDATE date_entries SET
                name = COALESCE($3, name),
                rating = COALESCE($4, rating),
                chemistry_rating = COALESCE($5, chemistry_rating),
                attraction_rating = COALESCE($6, attraction_rating),
                vibe_check = COALESCE($7, vibe_check),
                emotional_impact = COALESCE($8, emotional_impact),
                conversation_quality = COALESCE($9, conversation_quality),
                effort_level = COALESCE($10, effort_level),
                body_language = COALESCE($11, body_language),
                green_flags = COALESCE($12, green_flags),
                red_flags = COALESCE($13, red_flags),
                notes = COALESCE($14, notes),
                profile_image = COALESCE($15, profile_image),
                image_analysis = COALESCE($16, image_analysis),
                date = COALESCE($17, date)
            WHERE id = $1 AND owner_id = $2
            RETURNING {DATE_COLUMNS}
            "#
        );
        self.bounded(
            "update_date",
            sqlx::query_as::<_, DateEntry>(&sql)
                .bind(id)
                .bind(owner_id)
                .bind(&patch.name)
                .bind(patch.rating)
                .bind(patch.chemistry_rating)
                .bind(patch.attraction_rating)
                .bind(&patch.vibe_check)
                .bind(&patch.emotional_impact)
                .bind(&patch.conversation_quality)
                .bind(&patch.effort_level)
                .bind(&patch.body_language)
                .bind(&patch.green_flags)
                .bind(&patch.red_flags)
                .bind(&patch.notes)
                .bind(&patch.profile_image)
                .bind(&patch.image_analysis)
                .bind(&patch.date)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn remove_date(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let result = self
            .bounded(
                "remove_date",
                sqlx::query("DELETE FROM date_entries WHERE id = $1 AND owner_id = $2")
                    .bind(id)
                    .bind(owner_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
