//! Registration, login and token verification on top of the record store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::jwt::{create_token, verify_token};
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::services::mailer::{self, Mailer};
use crate::store::{RecordStore, StoreError};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn RecordStore>,
    config: Arc<Config>,
    mailer: Arc<dyn Mailer>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<Config>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }

    pub async fn register(&self, reg: Registration) -> AppResult<AuthSession> {
        let email = normalize_email(&reg.email);
        let username = reg.username.trim().to_string();

        if self.store.user_by_email(&email).await?.is_some() {
            tracing::warn!("Registration rejected: email taken");
            return Err(AppError::Conflict("Email already registered".into()));
        }
        if self.store.user_by_username(&username).await?.is_some() {
            tracing::warn!(username = %username, "Registration rejected: username taken");
            return Err(AppError::Conflict("Username already taken".into()));
        }

        validate_registration(&email, &username, &reg.password)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash: hash_password(&reg.password)?,
            first_name: clean_optional(reg.first_name),
            last_name: clean_optional(reg.last_name),
            created_at: Utc::now(),
        };

        // A concurrent registration can still win between the checks above
        // and this insert; the store's uniqueness rejection covers that.
        let user = match self.store.insert_user(user).await {
            Ok(user) => user,
            Err(StoreError::DuplicateKey(key)) => {
                tracing::warn!(key = %key, "Registration lost a uniqueness race");
                return Err(AppError::Conflict("Email or username already registered".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let token = create_token(user.id, &user.email, &self.config)?;

        mailer::dispatch_welcome(
            self.mailer.clone(),
            user.email.clone(),
            user.display_name().to_string(),
        );

        tracing::info!(user_id = %user.id, "User registered");
        Ok(AuthSession { user, token })
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let email = normalize_email(email);
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let matches = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash unreadable");
            false
        });
        if !matches {
            tracing::info!(user_id = %user.id, "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let token = create_token(user.id, &user.email, &self.config)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthSession { user, token })
    }

    /// A valid token for a user that no longer exists is still an invalid
    /// token.
    pub async fn verify(&self, token: &str) -> AppResult<User> {
        let claims = verify_token(token, &self.config)?;
        self.store
            .user_by_id(claims.user_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub async fn user(&self, id: Uuid) -> AppResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_registration(email: &str, username: &str, password: &str) -> AppResult<()> {
    if !validator::validate_email(email) {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if username.chars().count() < MIN_USERNAME_LEN
        || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must be at least 3 characters of letters, digits or underscores".into(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
