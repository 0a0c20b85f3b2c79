use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::{StatsResponse, UserResponse};
use crate::error::AppResult;
use crate::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.identity.user(auth_user.id).await?;
    Ok(Json(UserResponse {
        message: None,
        user: user.into(),
    }))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StatsResponse>> {
    let stats = state.dates.summary(auth_user.id).await?;
    Ok(Json(StatsResponse { stats }))
}
