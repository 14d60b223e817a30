pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::{emotion::EmotionPipeline, models::ModelManager, utils::error::EmotionError, Config, Result};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelManager>,
    pub pipeline: Arc<EmotionPipeline>,
}

impl AppState {
    pub fn new(models: ModelManager) -> Result<Self> {
        let pipeline = EmotionPipeline::new(&models)?;
        Ok(Self {
            config: Arc::new(models.config().clone()),
            models: Arc::new(models),
            pipeline: Arc::new(pipeline),
        })
    }
}

pub async fn serve(config: Config) -> Result<()> {
    // 启动时加载模型，失败即退出
    let models = ModelManager::load(&config)?;
    let state = AppState::new(models)?;

    let app = router(state);

    // 解析绑定地址
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        EmotionError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict       - Multipart image/audio upload");
    tracing::info!("  POST /predict/json  - JSON base64 upload");
    tracing::info!("  GET  /              - Web UI");
    tracing::info!("  GET  /health        - Health check");
    tracing::info!("  GET  /api/info      - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        EmotionError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| EmotionError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

/// 构建应用路由
pub fn router(state: AppState) -> Router {
    let server_config = &state.config.server_config;
    let body_limit = server_config.max_request_size;
    let request_timeout = Duration::from_secs(server_config.request_timeout);

    Router::new()
        .route("/predict", post(handlers::predict_upload_handler))
        .route("/predict/json", post(handlers::predict_json_handler))
        .route("/", get(ui::index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        // multipart默认2MB上限，改由下面的限制统一控制
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "models": {
            "image": state.models.image().label_set().name(),
            "audio": state.models.audio().label_set().name(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.models.get_stats();
    let features = &state.config.feature_config;

    Json(json!({
        "service": "Cat Emotion Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "models": stats,
        "features": {
            "image_size": features.image_size,
            "sample_rate": features.sample_rate,
            "n_mfcc": features.n_mfcc,
            "max_audio_seconds": features.max_audio_seconds,
            "image_formats": ["jpeg", "png"],
            "audio_formats": ["wav", "mp3"],
        },
        "theme": state.config.theme,
        "inference_timeout_secs": state.config.server_config.inference_timeout,
    }))
}
