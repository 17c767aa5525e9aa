pub mod analyze;
pub mod health;
pub mod pages;

use axum::routing::post;
use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /analyze        POST multipart `image` (+ optional `mode`) -> AnalysisReport JSON
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze::analyze_json))
}
