use axum::{extract::State, Json};
use serde::Serialize;

use crate::audit::AuditReport;
use crate::errors::AppError;
use crate::models::audit::{AuditScoreRecord, AuditSummary};
use crate::state::AppState;
use crate::store::{get_json, keys};
use crate::sync::handlers::RunRequest;

#[derive(Serialize)]
pub struct AuditStatusResponse {
    pub records: Vec<AuditScoreRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AuditSummary>,
}

/// GET /api/v1/audit
pub async fn handle_get_audit(
    State(state): State<AppState>,
) -> Result<Json<AuditStatusResponse>, AppError> {
    let records = state.audit.latest_records().await?;
    let summary = get_json::<AuditSummary>(state.store.as_ref(), keys::AUDIT_SUMMARY).await?;
    Ok(Json(AuditStatusResponse { records, summary }))
}

/// POST /api/v1/admin/audit
pub async fn handle_run_audit(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<AuditReport>, AppError> {
    let report = state.audit.run(request.force).await?;
    Ok(Json(report))
}
