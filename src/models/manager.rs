use crate::emotion::types::MediaKind;
use crate::models::{InferenceService, OnnxClassifier};
use crate::{Config, Result};
use std::sync::Arc;

/// 进程级模型管理器
///
/// 两个模型在启动时各加载一次，之后通过 `Arc` 只读共享。
/// 任一模型加载失败即视为启动失败。
pub struct ModelManager {
    image: Arc<dyn InferenceService>,
    audio: Arc<dyn InferenceService>,
    config: Config,
}

impl ModelManager {
    /// 从配置加载图像与音频模型
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let features = &config.feature_config;
        let image = OnnxClassifier::new(
            config,
            &config.image_model_path(),
            MediaKind::Image,
            features.image_label_set(),
        )?;
        let audio = OnnxClassifier::new(
            config,
            &config.audio_model_path(),
            MediaKind::Audio,
            features.audio_label_set(),
        )?;

        tracing::info!("Model manager initialized successfully");
        Ok(Self::from_services(config.clone(), Arc::new(image), Arc::new(audio)))
    }

    /// 使用已构建好的推理服务
    pub fn from_services(
        config: Config,
        image: Arc<dyn InferenceService>,
        audio: Arc<dyn InferenceService>,
    ) -> Self {
        Self { image, audio, config }
    }

    /// 获取图像模型引用
    pub fn image(&self) -> Arc<dyn InferenceService> {
        Arc::clone(&self.image)
    }

    /// 获取音频模型引用
    pub fn audio(&self) -> Arc<dyn InferenceService> {
        Arc::clone(&self.audio)
    }

    /// 两个模型的标签集合一致时才能融合
    pub fn supports_fusion(&self) -> bool {
        self.image
            .label_set()
            .is_compatible_with(&self.audio.label_set())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 获取模型统计信息
    pub fn get_stats(&self) -> ModelStats {
        ModelStats {
            image_label_set: self.image.label_set().name(),
            image_labels: self.image.label_set().labels(),
            audio_label_set: self.audio.label_set().name(),
            audio_labels: self.audio.label_set().labels(),
            fusion_supported: self.supports_fusion(),
            intra_threads: self.config.onnx_config.intra_threads,
            optimization_level: self.config.onnx_config.optimization_level,
        }
    }
}

/// 模型统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub image_label_set: &'static str,
    pub image_labels: &'static [&'static str],
    pub audio_label_set: &'static str,
    pub audio_labels: &'static [&'static str],
    pub fusion_supported: bool,
    pub intra_threads: usize,
    pub optimization_level: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::labels::{LabelSet, AUDIO_LABELS, IMAGE_LABELS, SHARED_LABELS};
    use crate::emotion::types::{FeatureTensor, ScoreVector};
    use crate::utils::error::EmotionError;

    struct Fixed(LabelSet);

    impl InferenceService for Fixed {
        fn label_set(&self) -> LabelSet {
            self.0
        }

        fn score(&self, _features: &FeatureTensor) -> Result<ScoreVector> {
            ScoreVector::new(self.0, vec![0.0; self.0.len()])
        }
    }

    fn config(dir: &str) -> Config {
        Config::new("127.0.0.1:0".to_string(), dir.to_string(), Some(1), false).unwrap()
    }

    #[test]
    fn missing_model_file_is_unavailable() {
        let err = ModelManager::load(&config("/nonexistent/cat-models")).err().unwrap();
        assert!(matches!(err, EmotionError::ModelUnavailable(_)), "got {:?}", err);
    }

    #[test]
    fn fusion_requires_matching_label_sets() {
        let separate = ModelManager::from_services(
            config("models"),
            Arc::new(Fixed(IMAGE_LABELS)),
            Arc::new(Fixed(AUDIO_LABELS)),
        );
        assert!(!separate.supports_fusion());
        assert_eq!(separate.get_stats().audio_labels.len(), 10);

        let shared = ModelManager::from_services(
            config("models"),
            Arc::new(Fixed(SHARED_LABELS)),
            Arc::new(Fixed(SHARED_LABELS)),
        );
        assert!(shared.supports_fusion());
        assert_eq!(shared.get_stats().image_label_set, "shared4");
    }
}
