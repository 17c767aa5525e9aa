use mien_core::{
    AnalysisMode, AnalysisReport, Analyzer, AnalyzerError, ImageUpload, LabelOptions, UploadError,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};

/// Capacity of the request queue in front of the engine task.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    #[error("analysis engine is not running")]
    ChannelClosed,
}

/// Raw upload as received from a client, before validation.
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

/// Messages sent from HTTP handlers to the engine task.
enum EngineRequest {
    Analyze {
        upload: RawUpload,
        mode: AnalysisMode,
        reply: oneshot::Sender<Result<AnalysisReport, EngineError>>,
    },
}

/// Limits the engine applies to every request.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub max_upload_bytes: usize,
    pub label_options: LabelOptions,
    pub max_concurrent: usize,
    /// Budget for the backend calls of one request, not counting time
    /// spent waiting for a permit.
    pub upstream_timeout: Duration,
}

/// Clone-safe handle to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    analyzer_name: Arc<str>,
}

impl EngineHandle {
    /// Validate an upload, run the requested analyses and return the report.
    pub async fn analyze(
        &self,
        upload: RawUpload,
        mode: AnalysisMode,
    ) -> Result<AnalysisReport, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Analyze {
                upload,
                mode,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Name of the backend the engine forwards to.
    pub fn analyzer_name(&self) -> &str {
        &self.analyzer_name
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Spawn the engine on the current tokio runtime.
///
/// Each request is validated and analyzed on its own task; a semaphore
/// caps how many reach the backend at once so a burst of uploads queues
/// here instead of tripping upstream throttling.
pub fn spawn_engine(analyzer: Arc<dyn Analyzer>, settings: EngineSettings) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);
    let analyzer_name: Arc<str> = Arc::from(analyzer.name());
    let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));

    tracing::info!(
        analyzer = %analyzer_name,
        max_concurrent = settings.max_concurrent,
        max_upload_bytes = settings.max_upload_bytes,
        upstream_timeout_secs = settings.upstream_timeout.as_secs_f32(),
        "engine starting"
    );

    tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            match req {
                EngineRequest::Analyze {
                    upload,
                    mode,
                    reply,
                } => {
                    let analyzer = Arc::clone(&analyzer);
                    let permits = Arc::clone(&permits);
                    tokio::spawn(async move {
                        let result =
                            run_analyze(&*analyzer, &permits, &settings, upload, mode).await;
                        let _ = reply.send(result);
                    });
                }
            }
        }
        tracing::info!("engine task exiting");
    });

    EngineHandle { tx, analyzer_name }
}

async fn run_analyze(
    analyzer: &dyn Analyzer,
    permits: &Semaphore,
    settings: &EngineSettings,
    upload: RawUpload,
    mode: AnalysisMode,
) -> Result<AnalysisReport, EngineError> {
    let image = ImageUpload::validate(upload.bytes, upload.file_name, settings.max_upload_bytes)
        .inspect_err(|e| tracing::info!(error = %e, "upload rejected"))?;

    let _permit = permits
        .acquire()
        .await
        .map_err(|_| EngineError::ChannelClosed)?;

    let analysis = mien_core::analyze(analyzer, &image, mode, &settings.label_options);
    match tokio::time::timeout(settings.upstream_timeout, analysis).await {
        Ok(report) => Ok(report?),
        Err(_) => {
            tracing::warn!(
                analyzer = analyzer.name(),
                sha256 = %image.sha256,
                timeout_secs = settings.upstream_timeout.as_secs_f32(),
                "analysis timed out"
            );
            Err(AnalyzerError::Timeout(format!(
                "{} did not respond within {:.1}s",
                analyzer.name(),
                settings.upstream_timeout.as_secs_f32()
            ))
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mien_core::{FaceDetail, Label};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracks the highest number of concurrent backend calls.
    struct SlowAnalyzer {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for SlowAnalyzer {
        fn name(&self) -> &str {
            "slow"
        }

        async fn detect_faces(&self, _: &ImageUpload) -> Result<Vec<FaceDetail>, AnalyzerError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn detect_labels(
            &self,
            _: &ImageUpload,
            _: &LabelOptions,
        ) -> Result<Vec<Label>, AnalyzerError> {
            Err(AnalyzerError::AccessDenied("no".into()))
        }
    }

    fn png() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(100, 100);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn settings(max_concurrent: usize) -> EngineSettings {
        EngineSettings {
            max_upload_bytes: mien_core::upload::MAX_IMAGE_BYTES,
            label_options: LabelOptions::default(),
            max_concurrent,
            upstream_timeout: Duration::from_secs(5),
        }
    }

    fn slow_by(delay: Duration) -> Arc<SlowAnalyzer> {
        Arc::new(SlowAnalyzer {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn slow() -> Arc<SlowAnalyzer> {
        slow_by(Duration::from_millis(20))
    }

    fn raw(bytes: Vec<u8>) -> RawUpload {
        RawUpload {
            bytes,
            file_name: Some("face.png".into()),
        }
    }

    #[tokio::test]
    async fn test_analyze_returns_report() {
        let handle = spawn_engine(slow(), settings(2));
        assert_eq!(handle.analyzer_name(), "slow");
        let report = handle
            .analyze(raw(png()), AnalysisMode::Faces)
            .await
            .unwrap();
        assert_eq!(report.faces, Some(vec![]));
        assert_eq!(report.image.width, 100);
    }

    #[tokio::test]
    async fn test_invalid_upload_never_reaches_backend() {
        let analyzer = slow();
        let handle = spawn_engine(analyzer.clone(), settings(2));
        let err = handle
            .analyze(raw(b"not an image".to_vec()), AnalysisMode::Faces)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Upload(UploadError::UnsupportedFormat(_))
        ));
        assert_eq!(analyzer.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces() {
        let handle = spawn_engine(slow(), settings(1));
        let err = handle
            .analyze(raw(png()), AnalysisMode::Labels)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Analyzer(AnalyzerError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let settings = EngineSettings {
            upstream_timeout: Duration::from_millis(50),
            ..settings(1)
        };
        let handle = spawn_engine(slow_by(Duration::from_secs(2)), settings);
        let err = handle
            .analyze(raw(png()), AnalysisMode::Faces)
            .await
            .unwrap_err();
        match err {
            EngineError::Analyzer(AnalyzerError::Timeout(message)) => {
                assert!(message.contains("slow"), "{message}");
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let analyzer = slow();
        let handle = spawn_engine(analyzer.clone(), settings(2));
        let calls: Vec<_> = (0..6)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle.analyze(raw(png()), AnalysisMode::Faces).await
                })
            })
            .collect();
        for call in calls {
            call.await.unwrap().unwrap();
        }
        let peak = analyzer.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak concurrency {peak}");
    }
}
