use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;

use crate::error::{AppError, HtmlError};
use crate::render;
use crate::routes::analyze::{read_upload_form, run_analysis};
use crate::state::AppState;

/// GET / -- the upload form.
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render::upload_page(
        state.config.default_mode,
        state.config.max_upload_bytes,
    ))
}

/// POST /analyze -- form submission from the upload page.
async fn analyze_page(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, HtmlError> {
    let mut multipart = multipart.map_err(AppError::from)?;
    let form = read_upload_form(&mut multipart, state.config.max_upload_bytes).await?;
    let report = run_analysis(&state, form, None).await?;
    Ok(Html(render::report_page(&report)))
}

/// Browser-facing routes, mounted at the root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze_page))
}

