use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{DateListResponse, DateResponse, ListDatesQuery, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::models::date_entry::{DateEntryPatch, DateFields};
use crate::AppState;

/// Ids that cannot name a stored entry get the same 404 as unknown ones.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::NotFound("The specified date could not be found".into()))
}

/// Date bodies are decoded from a parsed JSON value, so a field-level
/// deserializer message such as "Rating must be 1-10" reaches the client
/// without serde's path and position decorations.
fn decode<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

pub async fn list_dates(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    WithRejection(Query(query), _): WithRejection<Query<ListDatesQuery>, AppError>,
) -> AppResult<Json<DateListResponse>> {
    let dates = state.dates.list(auth_user.id).await?;
    let (dates, pagination) = query.paginate(dates);
    Ok(Json(DateListResponse { dates, pagination }))
}

pub async fn create_date(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<(StatusCode, Json<DateResponse>)> {
    let fields: DateFields = decode(body)?;
    fields.validate()?;
    let date = state.dates.create(auth_user.id, fields).await?;

    Ok((
        StatusCode::CREATED,
        Json(DateResponse {
            message: Some("Date created successfully"),
            date,
        }),
    ))
}

pub async fn get_date(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<DateResponse>> {
    let date = state.dates.get(auth_user.id, parse_id(&id)?).await?;
    Ok(Json(DateResponse {
        message: None,
        date,
    }))
}

pub async fn update_date(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AppError>,
) -> AppResult<Json<DateResponse>> {
    let id = parse_id(&id)?;
    let patch: DateEntryPatch = decode(body)?;
    patch.validate()?;
    let date = state.dates.update(auth_user.id, id, &patch).await?;

    Ok(Json(DateResponse {
        message: Some("Date updated successfully"),
        date,
    }))
}

pub async fn delete_date(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.dates.delete(auth_user.id, id).await? {
        return Err(AppError::NotFound(
            "The specified date could not be found".into(),
        ));
    }

    Ok(Json(MessageResponse {
        message: "Date deleted successfully".into(),
    }))
}
