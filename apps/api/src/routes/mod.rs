pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::audit::handlers as audit_handlers;
use crate::ballot::handlers as ballot_handlers;
use crate::guide::handlers as guide_handlers;
use crate::state::AppState;
use crate::sync::handlers as sync_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Public ballot API
        .route(
            "/api/v1/ballots/:party",
            get(ballot_handlers::handle_get_ballot),
        )
        .route("/api/v1/manifest", get(ballot_handlers::handle_get_manifest))
        // Guide generation
        .route("/api/v1/guide", post(guide_handlers::handle_generate_guide))
        // Audit results
        .route("/api/v1/audit", get(audit_handlers::handle_get_audit))
        // Curator / operator surface
        .route(
            "/api/v1/admin/ballots",
            post(ballot_handlers::handle_upload_ballot),
        )
        .route("/api/v1/admin/sync", post(sync_handlers::handle_run_sync))
        .route("/api/v1/admin/audit", post(audit_handlers::handle_run_audit))
        .with_state(state)
}
