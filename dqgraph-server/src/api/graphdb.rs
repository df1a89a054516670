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

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::pipeline::OUTPUT_TTL;

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// POST /api/graphdb/import - bulk-load the generated RDF artifact
/// into the repository. The pipeline must have run first.
pub async fn import_artifact(State(state): State<AppState>) -> Result<Json<OkResponse>, ApiError> {
    let path = state.pipeline.artifact_path(OUTPUT_TTL);
    if !path.exists() {
        return Err(ApiError::BadRequest(format!(
            "{OUTPUT_TTL} not found. Run the pipeline first."
        )));
    }

    let turtle = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(bytes = turtle.len(), "importing RDF into the store");
    state.store.import(turtle).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/graphdb/clear - drop every statement in the repository.
/// No confirmation step.
pub async fn clear_store(State(state): State<AppState>) -> Result<Json<OkResponse>, ApiError> {
    state.store.clear().await?;
    info!("repository cleared");
    Ok(Json(OkResponse { ok: true }))
}
