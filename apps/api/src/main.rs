mod audit;
mod ballot;
mod config;
mod districts;
mod errors;
mod gateway;
mod guide;
mod models;
mod parser;
mod routes;
mod state;
mod store;
mod sync;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::audit::{AuditProvider, AuditRunner};
use crate::config::Config;
use crate::districts::{DistrictLocator, HttpDistrictLocator};
use crate::gateway::backends::{AnthropicBackend, OpenAiBackend};
use crate::gateway::ModelGateway;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{memory::InMemoryStore, redis::RedisStore, KeyValueStore};
use crate::sync::SyncRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hustings API v{}", env!("CARGO_PKG_VERSION"));

    // Durable store: Redis when configured, in-process otherwise
    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set; using the in-memory store (data is lost on restart)");
            Arc::new(InMemoryStore::new())
        }
    };

    // Primary gateway: guide generation and ballot refresh
    let backend = Arc::new(AnthropicBackend::new(config.anthropic_api_key.clone()));
    let gateway = ModelGateway::new(backend);
    info!(
        "Model gateway initialized (models: {})",
        config.guide_models.join(", ")
    );

    // District lookup is optional
    let locator: Option<Arc<dyn DistrictLocator>> = match &config.district_service_url {
        Some(url) => {
            info!("District locator initialized ({url})");
            Some(Arc::new(HttpDistrictLocator::new(url.clone())))
        }
        None => {
            warn!("DISTRICT_SERVICE_URL not set; guides will not be district-filtered");
            None
        }
    };

    // Reviewer providers: Anthropic always, OpenAI when credentials exist
    let mut providers = vec![AuditProvider {
        name: "anthropic".to_string(),
        gateway: gateway.clone(),
        models: config.anthropic_audit_models.clone(),
    }];
    match &config.openai_api_key {
        Some(key) => providers.push(AuditProvider {
            name: "openai".to_string(),
            gateway: ModelGateway::new(Arc::new(OpenAiBackend::new(
                key.clone(),
                config.openai_base_url.clone(),
            ))),
            models: config.openai_audit_models.clone(),
        }),
        None => warn!("OPENAI_API_KEY not set; audits run with the Anthropic reviewer only"),
    }
    info!(
        "Audit providers: {}",
        providers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Scheduled cycles share the store and gateways
    let sync = Arc::new(SyncRunner::new(
        store.clone(),
        gateway.clone(),
        config.guide_models.clone(),
        chrono::Duration::hours(config.ballot_cooldown_hours),
    ));
    let audit = Arc::new(AuditRunner::new(
        store.clone(),
        providers,
        chrono::Duration::hours(config.audit_cooldown_hours),
    ));

    // Build app state
    let state = AppState {
        store,
        gateway,
        locator,
        sync,
        audit,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
