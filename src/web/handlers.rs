use crate::{
    emotion::types::{AnalysisOptions, AnalysisRequest, AnalysisResult, MediaKind, RawMediaInput},
    image::ImageLoader,
    utils::error::EmotionError,
    web::{extractors::{RequestId, ValidatedJson}, AppState},
    Result,
};
use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// JSON请求体（base64模式）
#[derive(Debug, Default, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64编码的图像，可带 data URL 前缀
    #[serde(default)]
    pub image: Option<String>,

    /// Base64编码的音频，可带 data URL 前缀
    #[serde(default)]
    pub audio: Option<String>,

    #[serde(default)]
    pub fuse: bool,

    #[serde(default = "default_true")]
    pub include_confidence: bool,

    #[serde(default)]
    pub include_scores: bool,
}

fn default_true() -> bool {
    true
}

/// JSON响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: String, request_id: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// 把错误转换为带请求ID的统一响应
pub fn error_response(err: EmotionError, request_id: String) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("Request failed: request_id={}, {} ({})", request_id, err, status);
    } else {
        tracing::warn!("Request rejected: request_id={}, {} ({})", request_id, err, status);
    }

    let body = ApiResponse::error(err.error_code(), err.to_string(), request_id);
    (status, Json(body)).into_response()
}

fn respond(result: Result<AnalysisResult>, request_id: String) -> Response {
    match result {
        Ok(result) => Json(ApiResponse::success(result, request_id)).into_response(),
        Err(err) => error_response(err, request_id),
    }
}

/// Multipart文件上传处理器
pub async fn predict_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    multipart: Multipart,
) -> Response {
    let start_time = Instant::now();
    tracing::info!("Processing multipart predict request: request_id={}", request_id);

    let result = predict_upload(&state, multipart).await;
    if result.is_ok() {
        tracing::info!(
            "Upload predict completed: request_id={}, time={:.3}s",
            request_id,
            start_time.elapsed().as_secs_f32()
        );
    }

    respond(result, request_id)
}

async fn predict_upload(state: &AppState, mut multipart: Multipart) -> Result<AnalysisResult> {
    let mut request = AnalysisRequest::default();

    // 解析multipart数据
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        EmotionError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "image" | "audio" => {
                let kind = if field_name == "image" {
                    MediaKind::Image
                } else {
                    MediaKind::Audio
                };
                let content_type = field.content_type().map(|s| s.to_string());

                let data = field.bytes().await.map_err(|e| {
                    EmotionError::InvalidInput(format!("Failed to read {} data: {}", kind, e))
                })?;

                // 浏览器在未选择文件时也会提交空字段
                if data.is_empty() {
                    tracing::debug!("Skipping empty {} field", kind);
                    continue;
                }

                tracing::debug!("Received {} file: {} bytes", kind, data.len());
                let input = RawMediaInput::new(kind, data, content_type.as_deref())?;
                match kind {
                    MediaKind::Image => request.image = Some(input),
                    MediaKind::Audio => request.audio = Some(input),
                }
            }
            "fuse" => {
                let value = read_text(field, &field_name).await?;
                request.options.fuse = parse_flag(&value, false);
            }
            "include_confidence" => {
                let value = read_text(field, &field_name).await?;
                request.options.include_confidence = parse_flag(&value, true);
            }
            "include_scores" => {
                let value = read_text(field, &field_name).await?;
                request.options.include_scores = parse_flag(&value, false);
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    run_analysis(state, request).await
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| EmotionError::InvalidInput(format!("Failed to read {} field: {}", name, e)))
}

/// JSON base64上传处理器
pub async fn predict_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(body): ValidatedJson<PredictJsonRequest>,
) -> Response {
    let start_time = Instant::now();
    tracing::info!(
        "Processing JSON predict request: request_id={}, image={}, audio={}, fuse={}",
        request_id,
        body.image.is_some(),
        body.audio.is_some(),
        body.fuse
    );

    let result = predict_json(&state, body).await;
    if result.is_ok() {
        tracing::info!(
            "JSON predict completed: request_id={}, time={:.3}s",
            request_id,
            start_time.elapsed().as_secs_f32()
        );
    }

    respond(result, request_id)
}

async fn predict_json(state: &AppState, body: PredictJsonRequest) -> Result<AnalysisResult> {
    let max_bytes = state.config.server_config.max_request_size;
    let request = AnalysisRequest {
        image: decode_field(MediaKind::Image, body.image.as_deref(), max_bytes)?,
        audio: decode_field(MediaKind::Audio, body.audio.as_deref(), max_bytes)?,
        options: AnalysisOptions {
            fuse: body.fuse,
            include_confidence: body.include_confidence,
            include_scores: body.include_scores,
        },
    };

    run_analysis(state, request).await
}

/// 在阻塞线程池中执行分析，超时返回 `Timeout`
async fn run_analysis(state: &AppState, request: AnalysisRequest) -> Result<AnalysisResult> {
    if request.is_empty() {
        return Err(EmotionError::NoInputProvided);
    }

    let pipeline = state.pipeline.clone();
    let limit = state.config.server_config.inference_timeout;

    let task = tokio::task::spawn_blocking(move || pipeline.analyze(&request));
    match tokio::time::timeout(Duration::from_secs(limit), task).await {
        Ok(joined) => joined
            .map_err(|e| EmotionError::Internal(format!("Analysis task failed: {}", e)))?,
        Err(_) => Err(EmotionError::Timeout(limit)),
    }
}

fn decode_field(kind: MediaKind, data: Option<&str>, max_bytes: usize) -> Result<Option<RawMediaInput>> {
    let data = match data.map(str::trim) {
        Some(data) if !data.is_empty() => data,
        _ => return Ok(None),
    };

    let bytes = ImageLoader::decode_base64(data, max_bytes)?;
    let declared = data
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty());

    RawMediaInput::new(kind, Bytes::from(bytes), declared).map(Some)
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => true,
        "false" | "0" | "off" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_form_values() {
        assert!(parse_flag("on", false));
        assert!(parse_flag("TRUE", false));
        assert!(!parse_flag("0", true));
        assert!(parse_flag("", true));
        assert!(!parse_flag("maybe", false));
    }

    #[test]
    fn blank_base64_field_is_absent() {
        assert!(decode_field(MediaKind::Image, Some("  "), 1024).unwrap().is_none());
        assert!(decode_field(MediaKind::Audio, None, 1024).unwrap().is_none());
    }

    #[test]
    fn data_url_type_is_checked_against_modality() {
        // "RIFF....WAVE" 的base64
        let wav = "data:image/png;base64,UklGRiQAAABXQVZF";
        let err = decode_field(MediaKind::Audio, Some(wav), 1024).unwrap_err();
        assert!(matches!(err, EmotionError::UnsupportedFormat(_)));
    }

    #[test]
    fn error_envelope_carries_request_id() {
        let body = serde_json::to_value(ApiResponse::error(
            "TIMEOUT",
            "Processing timed out after 30 seconds".to_string(),
            "req-7".to_string(),
        ))
        .unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["request_id"], "req-7");
        assert_eq!(body["error"]["code"], "TIMEOUT");
        assert!(body.get("data").is_none());
    }
}
