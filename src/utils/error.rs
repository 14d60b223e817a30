use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("Media decode failed: {0}")]
    Decode(String),

    #[error("Audio signal is empty: {0}")]
    EmptySignal(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Label set mismatch: {0}")]
    LabelSetMismatch(String),

    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("No input provided: upload at least one image or audio file")]
    NoInputProvided,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl EmotionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EmotionError::NoInputProvided => StatusCode::BAD_REQUEST,
            EmotionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EmotionError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EmotionError::EmptySignal(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EmotionError::LabelSetMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EmotionError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            EmotionError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            EmotionError::Base64(_) => StatusCode::BAD_REQUEST,
            EmotionError::Json(_) => StatusCode::BAD_REQUEST,
            EmotionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EmotionError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EmotionError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EmotionError::Decode(_) => "DECODE_ERROR",
            EmotionError::EmptySignal(_) => "EMPTY_SIGNAL",
            EmotionError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            EmotionError::LabelSetMismatch(_) => "LABEL_SET_MISMATCH",
            EmotionError::Timeout(_) => "TIMEOUT",
            EmotionError::NoInputProvided => "NO_INPUT_PROVIDED",
            EmotionError::InvalidInput(_) => "INVALID_INPUT",
            EmotionError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            EmotionError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            EmotionError::Inference(_) => "INFERENCE_ERROR",
            EmotionError::Config(_) => "CONFIG_ERROR",
            EmotionError::Io(_) => "IO_ERROR",
            EmotionError::Json(_) => "JSON_ERROR",
            EmotionError::Base64(_) => "BASE64_DECODE_ERROR",
            EmotionError::Ort(_) => "ORT_ERROR",
            EmotionError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for EmotionError {
    /// 处理器之外的错误没有调用方的请求ID，生成一个新的
    fn into_response(self) -> Response {
        crate::web::handlers::error_response(self, uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_map_to_client_errors() {
        assert_eq!(EmotionError::NoInputProvided.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            EmotionError::UnsupportedFormat("image/gif".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            EmotionError::Decode("garbage".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(EmotionError::Timeout(30).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(EmotionError::NoInputProvided.error_code(), "NO_INPUT_PROVIDED");
        assert_eq!(
            EmotionError::LabelSetMismatch("7 vs 10".into()).error_code(),
            "LABEL_SET_MISMATCH"
        );
        assert_eq!(EmotionError::EmptySignal("0 samples".into()).error_code(), "EMPTY_SIGNAL");
    }
}
