use actix_multipart::MultipartError;
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::classifier::ClassifierError;

/// Per-request failure kinds, mapped to HTTP status at the boundary. Every
/// kind renders as JSON `{"error": ...}`; the service never returns an
/// unstructured body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client sent an invalid upload (missing field, empty filename)
    #[error("{0}")]
    BadRequest(String),
    /// The uploaded bytes could not be decoded as an image
    #[error("{0}")]
    Decode(String),
    /// The forward pass itself failed
    #[error("{0}")]
    Inference(String),
    /// The predicted index has no reference row, i.e. the table and the
    /// model's label space are misaligned
    #[error("Class index {index} is outside the reference table ({rows} rows)")]
    Lookup { index: usize, rows: usize },
    /// Anything else that should never happen during request handling
    #[error("{0}")]
    Internal(String),
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::DecodeError(_) => ApiError::Decode(err.to_string()),
            ClassifierError::ValidationError(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Inference(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart payload: {}", err))
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("No file uploaded".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Decode("bad magic bytes".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Lookup { index: 31, rows: 25 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_classifier_error_kinds() {
        let decode: ApiError = ClassifierError::DecodeError("truncated".into()).into();
        assert!(matches!(decode, ApiError::Decode(_)));

        let bad_request: ApiError =
            ClassifierError::ValidationError("zero pixel dimensions".into()).into();
        assert!(matches!(bad_request, ApiError::BadRequest(_)));

        let inference: ApiError = ClassifierError::ModelError("session failed".into()).into();
        assert!(matches!(inference, ApiError::Inference(_)));

        let mismatch: ApiError = ClassifierError::ShapeMismatch {
            head: 1536,
            backbone: 768,
        }
        .into();
        assert!(matches!(mismatch, ApiError::Inference(_)));
    }

    #[test]
    fn test_lookup_message_names_both_sides() {
        let message = ApiError::Lookup { index: 31, rows: 25 }.to_string();
        assert!(message.contains("31"));
        assert!(message.contains("25"));
    }
}
