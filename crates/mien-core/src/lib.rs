//! mien-core — Upload validation and analysis results.
//!
//! Image analysis itself is delegated to an [`Analyzer`] implementation
//! (AWS Rekognition in production). This crate owns what happens on
//! either side of that call: checking the uploaded bytes, the result
//! types, and turning results into a report.

pub mod analyzer;
pub mod report;
pub mod types;
pub mod upload;

pub use analyzer::{Analyzer, AnalyzerError};
pub use report::{analyze, format_age, render_text, AnalysisMode, AnalysisReport, ImageSummary};
pub use types::{AgeRange, BoundingBox, Emotion, FaceAttribute, FaceDetail, Label, LabelOptions};
pub use upload::{ImageFormat, ImageUpload, UploadError};
