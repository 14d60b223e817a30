pub mod audio;
pub mod config;
pub mod emotion;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use emotion::{AnalysisResult, EmotionPipeline, Prediction};
pub use utils::error::EmotionError;

pub type Result<T> = std::result::Result<T, EmotionError>;
