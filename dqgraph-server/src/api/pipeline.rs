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
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::api::{ApiError, AppState};
use crate::pipeline::{StageReport, DATA_JSON, OUTPUT_TTL, RULES_RML_TTL};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub note: &'static str,
    pub files: ArtifactLinks,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactLinks {
    pub data_json: String,
    pub rules_rml_ttl: String,
    pub output_ttl: String,
}

impl ArtifactLinks {
    fn new() -> Self {
        Self {
            data_json: format!("/files/{DATA_JSON}"),
            rules_rml_ttl: format!("/files/{RULES_RML_TTL}"),
            output_ttl: format!("/files/{OUTPUT_TTL}"),
        }
    }
}

/// POST /api/process-upload - normalize the uploaded rules JSON and
/// run the conversion pipeline.
///
/// Concurrent uploads race on the shared artifact paths; callers must
/// serialize pipeline invocations externally.
pub async fn process_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, String)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let contents = field.text().await?;
            upload = Some((filename, contents));
        }
    }

    let (filename, contents) =
        upload.ok_or_else(|| ApiError::BadRequest("No 'file' in form-data.".to_string()))?;
    if filename.is_empty() {
        return Err(ApiError::BadRequest("No file selected.".to_string()));
    }
    if !filename.to_lowercase().ends_with(".json") {
        return Err(ApiError::BadRequest(
            "Please upload a .json file.".to_string(),
        ));
    }

    state.pipeline.write_rules(&contents)?;
    let report = state.pipeline.run().await?;

    Ok(Json(UploadResponse {
        ok: true,
        note: "Ensure rules.yml logical source points to /data/data.json inside the containers.",
        files: ArtifactLinks::new(),
        stages: report.stages,
    }))
}

/// GET /files/{filename} - serve one pipeline artifact as a
/// downloadable attachment. Only the known artifact names resolve, so
/// path traversal never reaches the filesystem.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = match filename.as_str() {
        DATA_JSON => "application/json",
        RULES_RML_TTL | OUTPUT_TTL => "text/turtle",
        _ => {
            return Err(ApiError::NotFound(format!(
                "unknown artifact: {filename}"
            )))
        }
    };

    let path = state.pipeline.artifact_path(&filename);
    if !path.exists() {
        return Err(ApiError::NotFound(format!(
            "{filename} has not been generated yet"
        )));
    }
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
