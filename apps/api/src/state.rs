use std::sync::Arc;

use crate::audit::AuditRunner;
use crate::config::Config;
use crate::districts::DistrictLocator;
use crate::gateway::ModelGateway;
use crate::store::KeyValueStore;
use crate::sync::SyncRunner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    /// Gateway over the primary (generation) provider.
    pub gateway: ModelGateway,
    /// Optional address lookup. Absent means guides are never district-filtered.
    pub locator: Option<Arc<dyn DistrictLocator>>,
    pub sync: Arc<SyncRunner>,
    pub audit: Arc<AuditRunner>,
    pub config: Config,
}
