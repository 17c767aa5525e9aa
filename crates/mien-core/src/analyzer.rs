//! The seam between this application and the image-analysis service.

use crate::types::{FaceDetail, Label, LabelOptions};
use crate::upload::ImageUpload;
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by an analysis backend.
///
/// Each variant keeps the upstream message so it can be shown to the user
/// as-is. Nothing is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("analysis service is throttling requests: {0}")]
    Throttled(String),
    #[error("image rejected by analysis service: {0}")]
    InvalidImage(String),
    #[error("access to analysis service denied: {0}")]
    AccessDenied(String),
    #[error("analysis service timed out: {0}")]
    Timeout(String),
    #[error("could not reach analysis service: {0}")]
    Transport(String),
    #[error("analysis service error {code}: {message}")]
    Service { code: String, message: String },
}

/// A backend that analyzes validated images.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short backend name shown in reports and health output.
    fn name(&self) -> &str;

    /// Detect faces, requesting every facial attribute the backend offers.
    async fn detect_faces(&self, image: &ImageUpload) -> Result<Vec<FaceDetail>, AnalyzerError>;

    /// Detect object/scene labels for the whole image.
    async fn detect_labels(
        &self,
        image: &ImageUpload,
        options: &LabelOptions,
    ) -> Result<Vec<Label>, AnalyzerError>;
}
