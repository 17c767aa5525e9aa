use crate::convert::{face_from_sdk, label_from_sdk};
use crate::error::map_sdk_error;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_rekognition::config::Region;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Attribute, Image};
use aws_sdk_rekognition::Client;
use mien_core::{Analyzer, AnalyzerError, FaceDetail, ImageUpload, Label, LabelOptions};
use std::time::Duration;

/// [`Analyzer`] backed by AWS Rekognition's DetectFaces and DetectLabels.
#[derive(Clone, Debug)]
pub struct RekognitionAnalyzer {
    client: Client,
}

impl RekognitionAnalyzer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the AWS default credential and region chain.
    ///
    /// `region` overrides whatever region the chain resolves. Each call,
    /// retries included, is abandoned after `operation_timeout` and
    /// reported as [`AnalyzerError::Timeout`].
    pub async fn from_env(region: Option<String>, operation_timeout: Duration) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(operation_timeout)
            .build();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(timeouts);
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("unset"),
            operation_timeout_secs = operation_timeout.as_secs_f32(),
            "rekognition client configured"
        );

        Self::new(Client::new(&sdk_config))
    }

    fn image(upload: &ImageUpload) -> Image {
        Image::builder()
            .bytes(Blob::new(upload.bytes().to_vec()))
            .build()
    }
}

#[async_trait]
impl Analyzer for RekognitionAnalyzer {
    fn name(&self) -> &str {
        "rekognition"
    }

    async fn detect_faces(&self, image: &ImageUpload) -> Result<Vec<FaceDetail>, AnalyzerError> {
        let output = self
            .client
            .detect_faces()
            .image(Self::image(image))
            .attributes(Attribute::All)
            .send()
            .await
            .map_err(|e| map_sdk_error("DetectFaces", e))?;

        let faces: Vec<FaceDetail> = output.face_details().iter().map(face_from_sdk).collect();
        tracing::debug!(sha256 = %image.sha256, count = faces.len(), "DetectFaces returned");
        Ok(faces)
    }

    async fn detect_labels(
        &self,
        image: &ImageUpload,
        options: &LabelOptions,
    ) -> Result<Vec<Label>, AnalyzerError> {
        let max_labels = i32::try_from(options.max_labels).unwrap_or(i32::MAX);
        let output = self
            .client
            .detect_labels()
            .image(Self::image(image))
            .max_labels(max_labels)
            .min_confidence(options.min_confidence)
            .send()
            .await
            .map_err(|e| map_sdk_error("DetectLabels", e))?;

        let labels: Vec<Label> = output.labels().iter().map(label_from_sdk).collect();
        tracing::debug!(sha256 = %image.sha256, count = labels.len(), "DetectLabels returned");
        Ok(labels)
    }
}
