#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mien_core::{
    Analyzer, AnalyzerError, Emotion, FaceAttribute, FaceDetail, ImageUpload, Label, LabelOptions,
};
use miend::app::build_router;
use miend::config::Config;
use miend::engine::{spawn_engine, EngineSettings};
use miend::state::AppState;

pub const BOUNDARY: &str = "mien-test-boundary";

/// Analyzer double returning canned results and counting calls.
pub struct StubAnalyzer {
    pub faces: Vec<FaceDetail>,
    pub labels: Vec<Label>,
    pub error: Option<AnalyzerError>,
    /// Sleep this long before answering.
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn new() -> Self {
        Self {
            faces: vec![happy_face()],
            labels: vec![hair_label()],
            error: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn failing(error: AnalyzerError) -> Self {
        Self {
            error: Some(error),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(&self, ok: &T) -> Result<T, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(ok.clone()),
        }
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn detect_faces(&self, _: &ImageUpload) -> Result<Vec<FaceDetail>, AnalyzerError> {
        self.answer(&self.faces).await
    }

    async fn detect_labels(
        &self,
        _: &ImageUpload,
        _: &LabelOptions,
    ) -> Result<Vec<Label>, AnalyzerError> {
        self.answer(&self.labels).await
    }
}

pub fn happy_face() -> FaceDetail {
    FaceDetail {
        confidence: 99.97,
        bounding_box: None,
        age_range: None,
        emotions: vec![
            Emotion {
                name: "CALM".into(),
                confidence: 3.5,
            },
            Emotion {
                name: "HAPPY".into(),
                confidence: 96.1,
            },
        ],
        attributes: vec![FaceAttribute {
            name: "Smile".into(),
            value: "true".into(),
            confidence: 98.0,
        }],
    }
}

pub fn hair_label() -> Label {
    Label {
        name: "Hair".into(),
        confidence: 99.4,
        parents: vec!["Person".into()],
        categories: vec![],
        instances: vec![],
    }
}

/// Build the full application router around `analyzer`.
pub fn build_test_app(analyzer: Arc<StubAnalyzer>, config: Config) -> Router {
    let engine = spawn_engine(
        analyzer,
        EngineSettings {
            max_upload_bytes: config.max_upload_bytes,
            label_options: config.label_options(),
            max_concurrent: config.max_concurrent_analyses,
            upstream_timeout: config.upstream_timeout(),
        },
    );
    build_router(AppState {
        engine,
        config: Arc::new(config),
    })
}

/// A valid PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([90, 60, 40]),
    ));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// One part of a multipart body.
pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

/// Shorthand for the `image` file part.
pub fn image_part<'a>(file_name: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "image",
        file_name,
        bytes,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(req).await.unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(req).await.unwrap()
}

/// POST an arbitrary body with the given content type.
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: &'static str,
) -> Response<Body> {
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(req).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
