#![deny(unused)]
//! Ripple - click-to-action image assistant.
//!
//! Upload a picture, click an object, pick one of the suggested actions:
//! edit the object in place, read about it, open a related page or search
//! for it.

use std::sync::Arc;

use ripple_core::{config::AppConfig, traits::SearchProvider};
use ripple_gateway::GatewayServer;
use ripple_model_gateway::create_clients;
use ripple_pipeline::{Pipeline, PipelineOptions};
use ripple_search::{SearchGateway, SerpApiProvider};
use ripple_store::{InMemorySessionStore, SessionLimits};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // Initialize tracing
    ripple_governance::configure_tracing(&config.telemetry)?;

    tracing::info!("Starting Ripple v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Collaborators
    // =========================================================================
    let clients = create_clients(&config.models);

    let provider: Option<Arc<dyn SearchProvider>> = match SerpApiProvider::from_config(&config.search) {
        Some(provider) => Some(Arc::new(provider)),
        None => {
            tracing::warn!("SERP_API_KEY not set, web search unavailable");
            None
        }
    };
    let search = SearchGateway::new(provider);

    let options = PipelineOptions::from_config(&config.search, &search);
    tracing::info!(
        engine = %config.search.engine,
        search_actions = search.is_configured(),
        web_search_enabled = options.web_search_enabled,
        "Web search configured"
    );

    let pipeline = Pipeline::new(clients.vision, clients.editor, search, options);

    // =========================================================================
    // Sessions & Gateway
    // =========================================================================
    let store = Arc::new(InMemorySessionStore::with_limits(SessionLimits::from_config(
        &config.sessions,
    )));
    let mut server = GatewayServer::new(
        config.server.clone(),
        config.gateway.clone(),
        store,
        pipeline,
    );

    if config.telemetry.metrics_enabled {
        let metrics_handle = ripple_governance::setup_metrics_recorder()?;
        server = server.with_metrics(metrics_handle);
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        vision_model = %config.models.vision_model,
        image_model = %config.models.image_model,
        "Gateway initialized"
    );

    server.run().await?;

    Ok(())
}
