use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::ballot::validation::validate_upload;
use crate::errors::AppError;
use crate::models::ballot::{Ballot, Party};
use crate::models::manifest::Manifest;
use crate::state::AppState;
use crate::store::{get_json, keys, put_json};

/// GET /api/v1/ballots/:party
pub async fn handle_get_ballot(
    State(state): State<AppState>,
    Path(party): Path<Party>,
) -> Result<Json<Ballot>, AppError> {
    if party == Party::Undecided {
        return Err(AppError::Validation(
            "no canonical ballot exists for undecided; fetch republican or democratic".to_string(),
        ));
    }
    let ballot = get_json::<Ballot>(state.store.as_ref(), &keys::ballot(party))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No ballot published for the {party} primary")))?;
    Ok(Json(ballot))
}

/// GET /api/v1/manifest
pub async fn handle_get_manifest(
    State(state): State<AppState>,
) -> Result<Json<Manifest>, AppError> {
    let manifest = get_json::<Manifest>(state.store.as_ref(), keys::MANIFEST)
        .await?
        .unwrap_or_default();
    Ok(Json(manifest))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub party: Party,
    pub version: i64,
    pub races: usize,
    pub propositions: usize,
}

/// POST /api/v1/admin/ballots
pub async fn handle_upload_ballot(
    State(state): State<AppState>,
    Json(ballot): Json<Ballot>,
) -> Result<Json<UploadResponse>, AppError> {
    validate_upload(&ballot).map_err(|v| AppError::Validation(v.to_string()))?;

    put_json(
        state.store.as_ref(),
        &keys::ballot(ballot.party),
        &ballot,
        None,
    )
    .await?;

    let mut manifest: Manifest = get_json(state.store.as_ref(), keys::MANIFEST)
        .await?
        .unwrap_or_default();
    let version = manifest
        .bump(ballot.party, Utc::now())
        .ok_or_else(|| AppError::Validation("undecided has no manifest slot".to_string()))?;
    put_json(state.store.as_ref(), keys::MANIFEST, &manifest, None).await?;

    info!(
        "Curator upload: {} ballot replaced ({} races, {} propositions), version {version}",
        ballot.party,
        ballot.races.len(),
        ballot.propositions.len()
    );
    Ok(Json(UploadResponse {
        party: ballot.party,
        version,
        races: ballot.races.len(),
        propositions: ballot.propositions.len(),
    }))
}
