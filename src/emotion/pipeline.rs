use crate::audio::AudioFeatureExtractor;
use crate::config::FeatureConfig;
use crate::emotion::decision::Decision;
use crate::emotion::types::{
    AnalysisOptions, AnalysisRequest, AnalysisResult, AnalysisStats, PredictionSource,
    RawMediaInput, ScoreVector,
};
use crate::image::ImageFeatureExtractor;
use crate::models::{InferenceService, ModelManager};
use crate::utils::error::EmotionError;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// 情绪识别流水线
///
/// 上传文件 → 特征提取 → 推理 → 决策。对调用方无状态，
/// 可在多个请求间共享同一个实例。
pub struct EmotionPipeline {
    image_extractor: ImageFeatureExtractor,
    audio_extractor: AudioFeatureExtractor,
    image_model: Arc<dyn InferenceService>,
    audio_model: Arc<dyn InferenceService>,
}

impl EmotionPipeline {
    pub fn new(manager: &ModelManager) -> Result<Self> {
        Self::with_services(
            &manager.config().feature_config,
            manager.image(),
            manager.audio(),
        )
    }

    pub fn with_services(
        features: &FeatureConfig,
        image_model: Arc<dyn InferenceService>,
        audio_model: Arc<dyn InferenceService>,
    ) -> Result<Self> {
        let audio_extractor =
            AudioFeatureExtractor::new(features.mfcc_config(), features.max_audio_seconds)?;

        Ok(Self {
            image_extractor: ImageFeatureExtractor::new(features.image_size),
            audio_extractor,
            image_model,
            audio_model,
        })
    }

    pub fn image_extractor(&self) -> &ImageFeatureExtractor {
        &self.image_extractor
    }

    pub fn audio_extractor(&self) -> &AudioFeatureExtractor {
        &self.audio_extractor
    }

    pub fn supports_fusion(&self) -> bool {
        self.image_model
            .label_set()
            .is_compatible_with(&self.audio_model.label_set())
    }

    /// 执行一次完整分析
    ///
    /// 任一模态失败则整个请求失败，不返回部分结果。
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        if request.is_empty() {
            return Err(EmotionError::NoInputProvided);
        }

        let options = request.options;
        let fuse = options.fuse && request.image.is_some() && request.audio.is_some();
        if fuse && !self.supports_fusion() {
            return Err(EmotionError::LabelSetMismatch(format!(
                "cannot fuse image label set '{}' with audio label set '{}'",
                self.image_model.label_set().name(),
                self.audio_model.label_set().name()
            )));
        }
        if options.fuse && !fuse {
            tracing::debug!("Fusion requested with a single modality, reporting it alone");
        }

        let start = Instant::now();
        let mut stats = AnalysisStats::default();

        let image_scores = match &request.image {
            Some(input) => {
                let stage = Instant::now();
                let scores = self.score_image(input)?;
                stats.image_time_ms = stage.elapsed().as_millis() as u64;
                Some(scores)
            }
            None => None,
        };

        let audio_scores = match &request.audio {
            Some(input) => {
                let stage = Instant::now();
                let scores = self.score_audio(input)?;
                stats.audio_time_ms = stage.elapsed().as_millis() as u64;
                Some(scores)
            }
            None => None,
        };

        let mut result = AnalysisResult {
            image: None,
            audio: None,
            fused: None,
            stats,
        };

        match (image_scores, audio_scores) {
            (Some(image), Some(audio)) if fuse => {
                let fused = Decision::fuse(&image, &audio)?;
                result.fused = Some(Self::decide(&fused, PredictionSource::Fused, options)?);
            }
            (image, audio) => {
                if let Some(scores) = image {
                    result.image = Some(Self::decide(&scores, PredictionSource::Image, options)?);
                }
                if let Some(scores) = audio {
                    result.audio = Some(Self::decide(&scores, PredictionSource::Audio, options)?);
                }
            }
        }

        result.stats.total_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Analysis completed in {}ms (image: {}, audio: {}, fused: {})",
            result.stats.total_time_ms,
            result.image.as_ref().map(|p| p.label.as_str()).unwrap_or("-"),
            result.audio.as_ref().map(|p| p.label.as_str()).unwrap_or("-"),
            result.fused.as_ref().map(|p| p.label.as_str()).unwrap_or("-"),
        );

        Ok(result)
    }

    fn score_image(&self, input: &RawMediaInput) -> Result<ScoreVector> {
        let features = self.image_extractor.extract(input)?;
        tracing::debug!("Image features {:?}", features.shape());
        self.image_model.score(&features)
    }

    fn score_audio(&self, input: &RawMediaInput) -> Result<ScoreVector> {
        let features = self.audio_extractor.extract(input)?;
        tracing::debug!("Audio features {:?}", features.shape());
        self.audio_model.score(&features)
    }

    fn decide(
        scores: &ScoreVector,
        source: PredictionSource,
        options: AnalysisOptions,
    ) -> Result<crate::emotion::types::Prediction> {
        Decision::decide(
            scores,
            source,
            options.include_confidence,
            options.include_scores,
        )
    }
}
