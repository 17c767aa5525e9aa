//! Server-rendered HTML for the browser routes.
//!
//! Everything echoed from an upload or the analysis backend goes through
//! [`escape`].

use axum::http::StatusCode;
use mien_core::upload::ALLOWED_EXTENSIONS;
use mien_core::{format_age, AnalysisMode, AnalysisReport, FaceDetail, Label};
use std::fmt::Write as _;

const TITLE: &str = "Image analysis using AWS Rekognition";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem;color:#222}\
h1{font-size:1.5rem}h2{font-size:1.15rem;margin-top:1.5rem}\
table{border-collapse:collapse}\
td,th{padding:.2rem .8rem;text-align:left;border-bottom:1px solid #ddd}\
.meta{color:#666;font-size:.9rem}.error{color:#a00}";

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape(title)
    )
}

/// The upload form.
pub fn upload_page(default_mode: AnalysisMode, max_upload_bytes: usize) -> String {
    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut options = String::new();
    for (mode, label) in [
        (AnalysisMode::Faces, "Faces and emotions"),
        (AnalysisMode::Labels, "Labels"),
        (AnalysisMode::All, "Both"),
    ] {
        let selected = if mode == default_mode { " selected" } else { "" };
        let _ = writeln!(options, "<option value=\"{mode}\"{selected}>{label}</option>");
    }

    let body = format!(
        "<h1>{TITLE}</h1>\n\
         <form method=\"post\" action=\"/analyze\" enctype=\"multipart/form-data\">\n\
         <p><label>Choose an image...<br>\
         <input type=\"file\" name=\"image\" accept=\"{accept}\" required></label></p>\n\
         <p><label>Analysis<br><select name=\"mode\">\n{options}</select></label></p>\n\
         <p><button type=\"submit\">Analyze</button></p>\n\
         </form>\n\
         <p class=\"meta\">JPEG or PNG, up to {} KiB.</p>\n",
        max_upload_bytes / 1024
    );
    page(TITLE, &body)
}

fn face_section(out: &mut String, idx: usize, face: &FaceDetail, width: u32, height: u32) {
    let _ = writeln!(out, "<h2>Face {}:</h2>", idx + 1);
    let _ = writeln!(out, "<p>Confidence: {:.2}</p>", face.confidence);

    let mut rows = String::new();
    if let Some(age) = &face.age_range {
        let _ = write!(
            rows,
            "<tr><td>Age range</td><td>{}</td><td></td></tr>",
            escape(&format_age(age.low, age.high))
        );
    }
    if let Some(b) = &face.bounding_box {
        let (x, y, w, h) = b.to_pixels(width, height);
        let _ = write!(
            rows,
            "<tr><td>Position</td><td>{w}&times;{h} at ({x}, {y})</td><td></td></tr>"
        );
    }
    for attr in &face.attributes {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            escape(&attr.name),
            escape(&attr.value),
            attr.confidence
        );
    }
    if !rows.is_empty() {
        let _ = writeln!(out, "<table>{rows}</table>");
    }

    out.push_str("<p>Emotions:</p>\n<ul>\n");
    for emotion in face.emotions_by_confidence() {
        let _ = writeln!(
            out,
            "<li>{}: {:.2}</li>",
            escape(&emotion.name),
            emotion.confidence
        );
    }
    out.push_str("</ul>\n");
}

fn labels_section(out: &mut String, labels: &[Label]) {
    out.push_str("<h2>Labels</h2>\n");
    if labels.is_empty() {
        out.push_str("<p>No labels detected.</p>\n");
        return;
    }
    out.push_str("<table>\n<tr><th>Label</th><th>Confidence</th><th>Parents</th></tr>\n");
    for label in labels {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            escape(&label.name),
            label.confidence,
            escape(&label.parents.join(", "))
        );
    }
    out.push_str("</table>\n");
}

/// Results page for one analysis.
pub fn report_page(report: &AnalysisReport) -> String {
    let mut body = format!("<h1>{TITLE}</h1>\n");
    let image = &report.image;
    let _ = writeln!(
        body,
        "<p class=\"meta\">{} &middot; {} {}&times;{} &middot; {} bytes \
         &middot; analyzed by {} at {}</p>",
        escape(image.file_name.as_deref().unwrap_or("(unnamed)")),
        image.format,
        image.width,
        image.height,
        image.size_bytes,
        escape(&report.analyzer),
        report.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    if let Some(faces) = &report.faces {
        if faces.is_empty() {
            body.push_str("<p>No faces detected.</p>\n");
        }
        for (idx, face) in faces.iter().enumerate() {
            face_section(&mut body, idx, face, image.width, image.height);
        }
    }

    if let Some(labels) = &report.labels {
        labels_section(&mut body, labels);
    }

    body.push_str("<p><a href=\"/\">Analyze another image</a></p>\n");
    page(TITLE, &body)
}

/// Error page showing the failure as reported.
pub fn error_page(status: StatusCode, code: &str, message: &str) -> String {
    let body = format!(
        "<h1>{TITLE}</h1>\n<p class=\"error\">{}</p>\n<p class=\"meta\">{} {}</p>\n\
         <p><a href=\"/\">Try again</a></p>\n",
        escape(message),
        status.as_u16(),
        escape(code),
    );
    page("Analysis failed", &body)
}
