use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use mien_core::{AnalysisMode, AnalysisReport};
use serde::Deserialize;

use crate::engine::RawUpload;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "image";
/// Optional multipart text field selecting the analysis mode.
pub const MODE_FIELD: &str = "mode";

/// Query parameters for the JSON analyze endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub mode: Option<String>,
}

/// An upload pulled out of a multipart body.
pub struct UploadForm {
    pub upload: RawUpload,
    pub mode: Option<AnalysisMode>,
}

/// Read the `image` file field and the optional `mode` field.
///
/// Other fields are skipped. A form without an `image` field is a bad
/// request; an `image` field with no content is left for validation to
/// reject as empty. `max_upload_bytes` is reported if the body limit cuts
/// the read short.
pub async fn read_upload_form(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
) -> AppResult<UploadForm> {
    let read_err = |err: MultipartError| AppError::from_multipart(err, max_upload_bytes);
    let mut upload = None;
    let mut mode = None;

    while let Some(field) = multipart.next_field().await.map_err(read_err)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                let bytes = field.bytes().await.map_err(read_err)?;
                upload = Some(RawUpload {
                    bytes: bytes.to_vec(),
                    file_name,
                });
            }
            MODE_FIELD => {
                let text = field.text().await.map_err(read_err)?;
                if !text.trim().is_empty() {
                    mode = Some(parse_mode(&text)?);
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring multipart field");
            }
        }
    }

    let upload = upload
        .ok_or_else(|| AppError::BadRequest(format!("missing '{IMAGE_FIELD}' file field")))?;
    Ok(UploadForm { upload, mode })
}

pub fn parse_mode(raw: &str) -> AppResult<AnalysisMode> {
    raw.parse::<AnalysisMode>().map_err(AppError::BadRequest)
}

/// Send a parsed upload through the engine, falling back to the configured mode.
pub async fn run_analysis(
    state: &AppState,
    form: UploadForm,
    fallback_mode: Option<AnalysisMode>,
) -> AppResult<AnalysisReport> {
    let mode = form
        .mode
        .or(fallback_mode)
        .unwrap_or(state.config.default_mode);
    tracing::info!(
        %mode,
        file_name = form.upload.file_name.as_deref().unwrap_or("-"),
        size = form.upload.bytes.len(),
        "analysis requested"
    );
    Ok(state.engine.analyze(form.upload, mode).await?)
}

/// POST /api/v1/analyze
///
/// A `mode` form field takes precedence over the `mode` query parameter.
/// Extractor rejections are taken as values so they answer in the same
/// JSON error shape as everything else.
pub async fn analyze_json(
    State(state): State<AppState>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<AnalysisReport>> {
    let Query(params) = params?;
    let mut multipart = multipart?;
    let query_mode = params.mode.as_deref().map(parse_mode).transpose()?;
    let form = read_upload_form(&mut multipart, state.config.max_upload_bytes).await?;
    let report = run_analysis(&state, form, query_mode).await?;
    Ok(Json(report))
}
