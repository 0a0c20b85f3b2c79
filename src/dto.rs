//! # Roster.AI request/response DTOs
//!
//! API contract types in one module. Field names are camelCase on the wire.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Date entry bodies reuse `models::date_entry::{DateFields, DateEntryPatch}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::date_entry::DateEntry;
use crate::models::user::PublicUser;
use crate::services::analysis::ImageAnalysis;
use crate::services::dates::DateSummary;
use crate::services::identity::Registration;
use crate::services::insights::{Advice, Insight};

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth/register
///
/// Only shape is checked here. Email format, username and password rules
/// run in the identity service, after the uniqueness checks.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// POST /api/auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register and login responses
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

/// POST /api/auth/verify, GET /api/users/me
#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: PublicUser,
}

// ============================================================================
// Dates
// ============================================================================

/// GET /api/dates query params
#[derive(Debug, Default, Deserialize)]
pub struct ListDatesQuery {
    /// 1-based. Default: 1
    pub page: Option<usize>,
    /// Default: everything on one page
    pub limit: Option<usize>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl ListDatesQuery {
    /// Slice `items` to the requested page. Out-of-range pages are empty.
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, Pagination) {
        let total = items.len();
        let page = self.page.unwrap_or(1).max(1);
        let limit = match self.limit {
            Some(l) if l > 0 => l,
            _ => total,
        };
        let pages = if limit == 0 {
            1
        } else {
            total.div_ceil(limit).max(1)
        };

        let start = (page - 1).saturating_mul(limit);
        let slice = items.into_iter().skip(start).take(limit).collect();

        (
            slice,
            Pagination {
                page,
                limit,
                total,
                pages,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DateListResponse {
    pub dates: Vec<DateEntry>,
    pub pagination: Pagination,
}

/// Single-entry responses (create, get, update)
#[derive(Debug, Serialize)]
pub struct DateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub date: DateEntry,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: DateSummary,
}

// ============================================================================
// AI
// ============================================================================

/// POST /api/ai/analyze-image
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeImageResponse {
    pub message: &'static str,
    pub analysis: ImageAnalysis,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub message: &'static str,
    pub advice: Advice,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub message: &'static str,
    pub insights: Vec<Insight>,
}
