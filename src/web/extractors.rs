use crate::web::handlers::ApiResponse;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

/// 验证的JSON提取器
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: for<'de> Deserialize<'de> + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id_from(req.headers());

        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|err| {
            ValidationRejection {
                request_id: request_id.clone(),
                error: ValidationError::JsonParse(err.body_text()),
            }
        })?;

        value.validate().map_err(|err| ValidationRejection {
            request_id,
            error: ValidationError::Validation(err.to_string()),
        })?;

        Ok(ValidatedJson(value))
    }
}

/// 验证trait
pub trait Validate {
    type Error: std::fmt::Display;

    fn validate(&self) -> Result<(), Self::Error>;
}

/// 验证错误类型
#[derive(Debug)]
pub enum ValidationError {
    JsonParse(String),
    Validation(String),
}

/// 验证失败时的拒绝响应，带上请求ID
#[derive(Debug)]
pub struct ValidationRejection {
    pub request_id: String,
    pub error: ValidationError,
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        tracing::warn!(
            "Request rejected: request_id={}, {}",
            self.request_id,
            self.error
        );

        let body = ApiResponse::error("VALIDATION_ERROR", self.error.to_string(), self.request_id);
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::JsonParse(msg) => write!(f, "JSON parse error: {}", msg),
            ValidationError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// 为JSON分析请求实现验证
impl Validate for crate::web::handlers::PredictJsonRequest {
    type Error = String;

    fn validate(&self) -> Result<(), Self::Error> {
        // 两者都缺失不在这里拒绝，交给流水线返回 NO_INPUT_PROVIDED
        for (name, value) in [("image", &self.image), ("audio", &self.audio)] {
            let data = match value.as_deref().map(str::trim) {
                Some(data) if !data.is_empty() => data,
                _ => continue,
            };

            if data.starts_with("data:") && !data.contains(',') {
                return Err(format!("{} data URL has no payload", name));
            }
            if data.len() < 4 {
                return Err(format!("{} data is too short to be base64 media", name));
            }
        }

        Ok(())
    }
}

/// 请求ID提取器
///
/// 优先使用调用方提供的 `X-Request-ID`。
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestId(request_id_from(&parts.headers)))
    }
}

fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get("X-Request-ID")
        .and_then(|value| value.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
