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

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use dqgraph_core::{catalog, sparql::sanitize_query};

use crate::api::{ApiError, AppState};
use crate::store::Row;

/// GET /api/queries/list - sorted catalog names
pub async fn list_queries() -> Json<Vec<&'static str>> {
    Json(catalog::names())
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NamedRunResponse {
    pub name: String,
    pub rows: Vec<Row>,
}

/// GET /api/queries/run?name=... - execute one catalog query. Unknown
/// names are resolved here, before any store contact.
pub async fn run_named(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
) -> Result<Json<NamedRunResponse>, ApiError> {
    let name = params
        .name
        .ok_or_else(|| ApiError::BadRequest("Missing ?name=...".to_string()))?;
    let body = catalog::get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown query name: {name}")))?;

    let rows = state.store.query(&sanitize_query(body)).await?;
    Ok(Json(NamedRunResponse { name, rows }))
}

#[derive(Debug, Serialize)]
pub struct RawRunResponse {
    pub rows: Vec<Row>,
    /// The normalized query that was actually executed.
    pub query: String,
}

/// POST /api/queries/run-raw - execute a caller-supplied query,
/// accepted either as a JSON `{"query": ...}` payload or as a raw
/// text body.
pub async fn run_raw(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RawRunResponse>, ApiError> {
    let text = String::from_utf8(body.to_vec())
        .map_err(|_| ApiError::BadRequest("request body is not valid UTF-8".to_string()))?;

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    let raw_query = if is_json {
        let payload: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
        payload["query"].as_str().unwrap_or_default().to_string()
    } else {
        text
    };

    let query = sanitize_query(&raw_query);
    if query.is_empty() {
        return Err(ApiError::BadRequest("Provide a SPARQL query.".to_string()));
    }

    let rows = state.store.query(&query).await?;
    Ok(Json(RawRunResponse { rows, query }))
}
