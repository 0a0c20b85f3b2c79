use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    extract::WithRejection,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let session = state.identity.register(body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: session.user.into(),
            token: session.token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.identity.login(&body.email, &body.password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: session.user.into(),
        token: session.token,
    }))
}

/// Public route; reads the bearer token itself.
pub async fn verify(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> AppResult<Json<UserResponse>> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    let user = state.identity.verify(bearer.token()).await?;

    Ok(Json(UserResponse {
        message: Some("Token is valid"),
        user: user.into(),
    }))
}
