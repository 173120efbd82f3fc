use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;
use crate::sync::SyncReport;

/// Body for the admin run endpoints. `force` bypasses the cooldown.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub force: bool,
}

/// POST /api/v1/admin/sync
pub async fn handle_run_sync(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.sync.run(request.force).await?;
    Ok(Json(report))
}
