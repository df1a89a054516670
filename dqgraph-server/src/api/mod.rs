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
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use dqgraph_core::DqError;

use crate::config::ServerConfig;
use crate::nl2sparql::Translator;
use crate::pipeline::Pipeline;
use crate::store::StoreGateway;

pub mod graphdb;
pub mod health;
pub mod nl2sparql;
pub mod pipeline;
pub mod queries;

pub use graphdb::{clear_store, import_artifact};
pub use health::{health_check, home};
pub use nl2sparql::{translate, translate_run};
pub use pipeline::{download_artifact, process_upload};
pub use queries::{list_queries, run_named, run_raw};

/// API error type. Every component failure is caught at the request
/// boundary and rendered as a structured JSON error; nothing crashes
/// the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// A stage, store or provider failure. `status` and `details`
    /// carry the upstream response for diagnosis when available.
    #[error("{message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        details: String,
    },

    #[error("{0}")]
    Internal(String),
}

impl From<DqError> for ApiError {
    fn from(err: DqError) -> Self {
        match err {
            DqError::InvalidInput(msg) => ApiError::BadRequest(msg),
            DqError::MissingInput(path) => ApiError::BadRequest(format!(
                "{} not found. Run the pipeline prerequisites first.",
                path.display()
            )),
            DqError::StageExecutionFailed {
                ref command,
                ref stdout,
                ref stderr,
            } => ApiError::Upstream {
                message: format!("pipeline stage failed: {command}"),
                status: None,
                details: format!("STDOUT:\n{stdout}\nSTDERR:\n{stderr}"),
            },
            DqError::StoreRejected { status, body } => ApiError::Upstream {
                message: "store error".to_string(),
                status,
                details: body,
            },
            DqError::Provider(msg) => ApiError::Upstream {
                message: msg,
                status: None,
                details: String::new(),
            },
            DqError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    status: None,
                    details: None,
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: message,
                    status: None,
                    details: None,
                },
            ),
            ApiError::Upstream {
                message,
                status,
                details,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: message,
                    status,
                    details: if details.is_empty() {
                        None
                    } else {
                        Some(details)
                    },
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: message,
                    status: None,
                    details: None,
                },
            ),
        };

        (code, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Shared application state. Immutable after startup; request
/// concurrency needs no locking because nothing here is mutable.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<StoreGateway>,
    pub translator: Arc<Translator>,
}
