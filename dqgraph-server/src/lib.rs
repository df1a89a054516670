// Copyright 2025 DQGraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod api;
pub mod config;
pub mod nl2sparql;
pub mod pipeline;
pub mod store;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::ServerConfig;
use nl2sparql::{OpenAiProvider, Translator};
use pipeline::{Pipeline, ProcessRunner};
use store::StoreGateway;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dqgraph_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DQGraph Server");
    config.validate()?;

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; NL->SPARQL translation will fail until configured");
    }

    let config = Arc::new(config);
    let pipeline = Arc::new(Pipeline::new(
        config.pipeline.clone(),
        Arc::new(ProcessRunner),
    ));
    let store = Arc::new(StoreGateway::new(&config.store)?);
    let translator = Arc::new(Translator::new(Arc::new(OpenAiProvider::new(&config.llm)?)));

    tracing::info!(
        data_dir = %config.pipeline.data_dir.display(),
        store = %config.store.repository_url(),
        model = %config.llm.model,
        "components initialized"
    );

    let state = AppState {
        config: config.clone(),
        pipeline,
        store,
        translator,
    };

    let app = build_router(state, &config);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Assemble the route table. Split out of `run_server` so tests can
/// stand up the router without binding a socket.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/", get(api::home))
        .route("/health", get(api::health_check))
        .route("/api/process-upload", post(api::process_upload))
        .route("/files/:filename", get(api::download_artifact))
        .route("/api/graphdb/import", post(api::import_artifact))
        .route("/api/graphdb/clear", post(api::clear_store))
        .route("/api/queries/list", get(api::list_queries))
        .route("/api/queries/run", get(api::run_named))
        .route("/api/queries/run-raw", post(api::run_raw))
        .route("/api/nl2sparql/translate", post(api::translate))
        .route("/api/nl2sparql/translate-run", post(api::translate_run))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}
