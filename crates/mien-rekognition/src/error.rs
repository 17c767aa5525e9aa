use aws_sdk_rekognition::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use mien_core::AnalyzerError;

/// Map an SDK failure for `operation` onto the backend-neutral error.
pub fn map_sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> AnalyzerError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if let Some(service) = err.as_service_error() {
        let mapped = classify_service_error(service.code(), service.message());
        tracing::warn!(operation, error = %mapped, "rekognition service error");
        return mapped;
    }

    let detail = format!("{operation}: {}", DisplayErrorContext(&err));
    tracing::warn!(operation, error = %detail, "rekognition request failed");
    match err {
        SdkError::TimeoutError(_) => AnalyzerError::Timeout(detail),
        _ => AnalyzerError::Transport(detail),
    }
}

/// Classify a Rekognition service error by its error code.
pub fn classify_service_error(code: Option<&str>, message: Option<&str>) -> AnalyzerError {
    let code = code.unwrap_or("Unknown");
    let message = message.unwrap_or(code).to_string();

    match code {
        "ThrottlingException" | "ProvisionedThroughputExceededException" => {
            AnalyzerError::Throttled(message)
        }
        "InvalidImageFormatException"
        | "ImageTooLargeException"
        | "InvalidParameterException" => AnalyzerError::InvalidImage(message),
        "AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException" => {
            AnalyzerError::AccessDenied(message)
        }
        _ => AnalyzerError::Service {
            code: code.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rekognition::error::ErrorMetadata;
    use aws_sdk_rekognition::operation::detect_faces::DetectFacesError;

    type FacesSdkError = SdkError<DetectFacesError, ()>;

    #[test]
    fn test_sdk_timeout_maps_to_timeout() {
        let err = FacesSdkError::timeout_error("operation timeout (all attempts) elapsed");
        match map_sdk_error("DetectFaces", err) {
            AnalyzerError::Timeout(detail) => assert!(detail.starts_with("DetectFaces: ")),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_non_service_failure_maps_to_transport() {
        let err = FacesSdkError::construction_failure("missing image");
        match map_sdk_error("DetectFaces", err) {
            AnalyzerError::Transport(detail) => assert!(detail.contains("DetectFaces")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_service_error_is_classified_by_code() {
        let meta = ErrorMetadata::builder()
            .code("ThrottlingException")
            .message("Rate exceeded")
            .build();
        let err = FacesSdkError::service_error(DetectFacesError::generic(meta), ());
        assert_eq!(
            map_sdk_error("DetectFaces", err),
            AnalyzerError::Throttled("Rate exceeded".into())
        );
    }

    #[test]
    fn test_throttling_codes() {
        for code in ["ThrottlingException", "ProvisionedThroughputExceededException"] {
            assert_eq!(
                classify_service_error(Some(code), Some("rate exceeded")),
                AnalyzerError::Throttled("rate exceeded".into())
            );
        }
    }

    #[test]
    fn test_invalid_image_codes() {
        assert_eq!(
            classify_service_error(
                Some("InvalidImageFormatException"),
                Some("Request has invalid image format")
            ),
            AnalyzerError::InvalidImage("Request has invalid image format".into())
        );
        assert!(matches!(
            classify_service_error(Some("ImageTooLargeException"), None),
            AnalyzerError::InvalidImage(_)
        ));
    }

    #[test]
    fn test_access_denied() {
        assert!(matches!(
            classify_service_error(Some("AccessDeniedException"), Some("not authorized")),
            AnalyzerError::AccessDenied(_)
        ));
    }

    #[test]
    fn test_unknown_code_passes_through() {
        assert_eq!(
            classify_service_error(Some("InternalServerError"), Some("boom")),
            AnalyzerError::Service {
                code: "InternalServerError".into(),
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_missing_code_and_message() {
        assert_eq!(
            classify_service_error(None, None),
            AnalyzerError::Service {
                code: "Unknown".into(),
                message: "Unknown".into()
            }
        );
    }
}
