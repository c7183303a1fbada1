//! Request handlers.

use std::path::Path;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use invex_core::{
    DocumentFormat, ExtractedRecord, ExtractionWarning, ProcessOutcome, RefinementStatus,
};

use super::templates::{self, Downloads};
use super::AppState;

/// Health check.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Upload form.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(templates::form_page(state.llm_available()))
}

/// Form submission: run the pipeline and render the results page.
pub async fn process_form(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };

    let outcome = match run(&state, &upload).await {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    let engine = base64::engine::general_purpose::STANDARD;
    let downloads = Downloads {
        stem: file_stem(&outcome),
        csv_data_url: format!("data:text/csv;base64,{}", engine.encode(&outcome.export.csv)),
        json_data_url: outcome
            .export
            .json
            .as_ref()
            .map(|json| format!("data:application/json;base64,{}", engine.encode(json))),
    };

    Html(templates::results_page(&outcome, &downloads)).into_response()
}

/// Output format of the API endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    #[serde(default)]
    pub format: ApiFormat,
}

#[derive(Serialize)]
struct ApiResponse<'a> {
    file: String,
    format: Option<DocumentFormat>,
    status: String,
    error: Option<String>,
    record: &'a ExtractedRecord,
    warnings: &'a [ExtractionWarning],
    refinement: &'a RefinementStatus,
    processing_time_ms: u64,
}

/// Same processing as the form, answered as JSON or CSV.
///
/// Inputs that cannot be opened get 422 with the JSON body whatever the
/// requested format.
pub async fn process_api(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
    multipart: Multipart,
) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };

    let outcome = match run(&state, &upload).await {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    let input_error = outcome.failure.as_ref().is_some_and(|e| e.is_input_error());

    match query.format {
        ApiFormat::Csv if !input_error => {
            let disposition = format!("attachment; filename=\"{}.csv\"", file_stem(&outcome));
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                outcome.export.csv,
            )
                .into_response()
        }
        _ => {
            let status = if input_error {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::OK
            };
            let body = ApiResponse {
                file: outcome.file_name(),
                format: outcome.format,
                status: outcome.status_line(),
                error: outcome.failure_message(),
                record: &outcome.record,
                warnings: &outcome.warnings,
                refinement: &outcome.refinement,
                processing_time_ms: outcome.processing_time_ms,
            };
            (status, Json(body)).into_response()
        }
    }
}

/// A request-level failure, before any pipeline stage ran.
#[derive(Debug)]
pub struct UploadError {
    status: StatusCode,
    message: String,
}

impl UploadError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Keep the status multipart parsing chose, e.g. 413 for an oversize body.
    fn multipart(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: format!("Failed to read upload: {}", e.body_text()),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

struct Upload {
    file_name: String,
    bytes: Bytes,
    use_llm: bool,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, UploadError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut use_llm = false;

    while let Some(field) = multipart.next_field().await.map_err(UploadError::multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(UploadError::multipart)?;
                file = Some((file_name, bytes));
            }
            "use_llm" => {
                let value = field.text().await.map_err(UploadError::multipart)?;
                use_llm = matches!(value.trim(), "on" | "true" | "1" | "yes");
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| UploadError::bad_request("No file uploaded"))?;
    debug!("Received {} ({} bytes)", file_name, bytes.len());

    Ok(Upload {
        file_name,
        bytes,
        use_llm,
    })
}

/// Stage the upload under its own name and run it through the pipeline.
///
/// The name matters: the format is detected from the extension.
async fn run(state: &AppState, upload: &Upload) -> Result<ProcessOutcome, UploadError> {
    let dir = TempDir::new()
        .map_err(|e| UploadError::internal(format!("Failed to create temp dir: {}", e)))?;
    let path = dir.path().join(safe_file_name(&upload.file_name));

    tokio::fs::write(&path, &upload.bytes)
        .await
        .map_err(|e| UploadError::internal(format!("Failed to store upload: {}", e)))?;

    let refine = upload.use_llm && state.llm_available();
    info!("Processing upload {} (refine: {})", path.display(), refine);

    let outcome = if refine {
        state.pipeline.process(&path).await
    } else {
        state.pipeline.process_heuristic(&path).await
    };

    if let Some(message) = outcome.failure_message() {
        warn!("{}: {}", outcome.file_name(), message);
    }

    Ok(outcome)
}

/// Final path component of a client-supplied name, restricted to a safe
/// character set.
fn safe_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_start_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn file_stem(outcome: &ProcessOutcome) -> String {
    outcome
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "invoice".to_string())
}
