use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::guide::generator::{generate_guides, GuideRequest, GuideResponse};
use crate::state::AppState;

/// POST /api/v1/guide
pub async fn handle_generate_guide(
    State(state): State<AppState>,
    Json(request): Json<GuideRequest>,
) -> Result<Json<GuideResponse>, AppError> {
    let response = generate_guides(
        state.store.as_ref(),
        &state.gateway,
        state.locator.as_deref(),
        &state.config.guide_models,
        request,
    )
    .await?;
    Ok(Json(response))
}
