//! Running an analysis and presenting its result.

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::types::{FaceDetail, Label, LabelOptions};
use crate::upload::{ImageFormat, ImageUpload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use uuid::Uuid;

/// Which analyses to run on an upload.
///
/// Serialized lowercase. Deserialization goes through [`FromStr`], so every
/// source (query, form field, config file, environment) accepts the same
/// spellings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AnalysisMode {
    /// Face detection with emotions and facial attributes.
    #[default]
    Faces,
    /// Object and scene labels.
    Labels,
    /// Both, issued concurrently.
    All,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Faces => "faces",
            AnalysisMode::Labels => "labels",
            AnalysisMode::All => "all",
        })
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "faces" | "face" => Ok(AnalysisMode::Faces),
            "labels" | "label" => Ok(AnalysisMode::Labels),
            "all" => Ok(AnalysisMode::All),
            other => Err(format!(
                "unknown analysis mode '{other}' (expected faces, labels or all)"
            )),
        }
    }
}

impl TryFrom<String> for AnalysisMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The parts of an upload worth echoing back next to its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub file_name: Option<String>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub sha256: String,
}

impl From<&ImageUpload> for ImageSummary {
    fn from(image: &ImageUpload) -> Self {
        Self {
            file_name: image.file_name.clone(),
            format: image.format,
            width: image.width,
            height: image.height,
            size_bytes: image.size_bytes(),
            sha256: image.sha256.clone(),
        }
    }
}

/// Result of analyzing one upload. Built, displayed, discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub analyzer: String,
    pub mode: AnalysisMode,
    pub image: ImageSummary,
    /// Present when the mode includes faces; empty means none were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<FaceDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
}

/// Run the analyses `mode` asks for and assemble a report.
///
/// Any backend error fails the whole analysis; partial results are not
/// reported.
pub async fn analyze(
    analyzer: &dyn Analyzer,
    image: &ImageUpload,
    mode: AnalysisMode,
    label_options: &LabelOptions,
) -> Result<AnalysisReport, AnalyzerError> {
    let (faces, labels) = match mode {
        AnalysisMode::Faces => (Some(analyzer.detect_faces(image).await?), None),
        AnalysisMode::Labels => (
            None,
            Some(analyzer.detect_labels(image, label_options).await?),
        ),
        AnalysisMode::All => {
            let (faces, labels) = futures::future::try_join(
                analyzer.detect_faces(image),
                analyzer.detect_labels(image, label_options),
            )
            .await?;
            (Some(faces), Some(labels))
        }
    };

    let report = AnalysisReport {
        id: Uuid::new_v4(),
        analyzed_at: Utc::now(),
        analyzer: analyzer.name().to_string(),
        mode,
        image: ImageSummary::from(image),
        faces,
        labels,
    };

    tracing::info!(
        id = %report.id,
        analyzer = %report.analyzer,
        %mode,
        sha256 = %image.sha256,
        faces = report.faces.as_ref().map(Vec::len),
        labels = report.labels.as_ref().map(Vec::len),
        "analysis complete"
    );

    Ok(report)
}

/// Plain-text rendering used by the CLI.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let name = report.image.file_name.as_deref().unwrap_or("(unnamed)");
    let _ = writeln!(
        out,
        "Image: {name} ({} {}x{}, {} bytes)",
        report.image.format, report.image.width, report.image.height, report.image.size_bytes
    );

    if let Some(faces) = &report.faces {
        if faces.is_empty() {
            out.push_str("No faces detected.\n");
        }
        for (idx, face) in faces.iter().enumerate() {
            let _ = writeln!(out, "Face {}:", idx + 1);
            let _ = writeln!(out, "Confidence: {:.2}", face.confidence);
            if let Some(age) = &face.age_range {
                let _ = writeln!(out, "Age range: {}", format_age(age.low, age.high));
            }
            for attr in &face.attributes {
                let _ = writeln!(out, "{}: {} ({:.2})", attr.name, attr.value, attr.confidence);
            }
            out.push_str("Emotions:\n");
            for emotion in face.emotions_by_confidence() {
                let _ = writeln!(out, "  - {}: {:.2}", emotion.name, emotion.confidence);
            }
        }
    }

    if let Some(labels) = &report.labels {
        if labels.is_empty() {
            out.push_str("No labels detected.\n");
        } else {
            out.push_str("Labels:\n");
        }
        for label in labels {
            let _ = write!(out, "  - {}: {:.2}", label.name, label.confidence);
            if !label.parents.is_empty() {
                let _ = write!(out, " ({})", label.parents.join(", "));
            }
            out.push('\n');
        }
    }

    out
}

/// Human-readable age range, tolerating missing bounds.
pub fn format_age(low: Option<u32>, high: Option<u32>) -> String {
    match (low, high) {
        (Some(l), Some(h)) => format!("{l}-{h}"),
        (Some(l), None) => format!("{l}+"),
        (None, Some(h)) => format!("up to {h}"),
        (None, None) => "unknown".to_string(),
    }
}
