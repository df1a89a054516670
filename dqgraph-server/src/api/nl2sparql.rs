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
use serde::{Deserialize, Serialize};

use dqgraph_core::sparql::sanitize_query;

use crate::api::{ApiError, AppState};
use crate::store::Row;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateRunResponse {
    pub query: String,
    pub rows: Vec<Row>,
}

/// POST /api/nl2sparql/translate - question in, generated query out.
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest(
            "Provide JSON with 'question'.".to_string(),
        ));
    }
    let query = state.translator.translate(question).await?;
    Ok(Json(TranslateResponse { query }))
}

/// POST /api/nl2sparql/translate-run - translate, normalize, execute.
pub async fn translate_run(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateRunResponse>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest(
            "Provide JSON with 'question'.".to_string(),
        ));
    }
    let query = sanitize_query(&state.translator.translate(question).await?);
    let rows = state.store.query(&query).await?;
    Ok(Json(TranslateRunResponse { query, rows }))
}
