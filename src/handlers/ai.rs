use axum::{extract::State, Extension, Json};
use axum_extra::extract::WithRejection;

use crate::auth::middleware::AuthUser;
use crate::dto::{AdviceResponse, AnalyzeImageRequest, AnalyzeImageResponse, InsightsResponse};
use crate::error::{AppError, AppResult};
use crate::services::insights::{dating_advice, generate_insights};
use crate::AppState;

pub async fn analyze_image(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<AnalyzeImageRequest>, AppError>,
) -> AppResult<Json<AnalyzeImageResponse>> {
    let image_url = body
        .image_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Please provide an image URL to analyze".into()))?;

    let analysis = state.analyzer.analyze(&image_url).await?;

    Ok(Json(AnalyzeImageResponse {
        message: "Image analysis completed",
        analysis,
    }))
}

pub async fn advice() -> Json<AdviceResponse> {
    Json(AdviceResponse {
        message: "Advice generated successfully",
        advice: dating_advice(),
    })
}

/// Cards are computed from the caller's own entries only.
pub async fn insights(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<InsightsResponse>> {
    let dates = state.dates.list(auth_user.id).await?;
    let insights = generate_insights(&dates);
    tracing::debug!(
        user_id = %auth_user.id,
        email = %auth_user.email,
        cards = insights.len(),
        "Insights generated"
    );

    Ok(Json(InsightsResponse {
        message: "Insights generated successfully",
        insights,
    }))
}
