use crate::emotion::labels::LabelSet;
use crate::image::ImageLoader;
use crate::utils::error::EmotionError;
use crate::Result;
use axum::body::Bytes;
use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

/// 输入媒体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 允许的容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    Wav,
    Mp3,
}

impl MediaFormat {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaFormat::Jpeg | MediaFormat::Png => MediaKind::Image,
            MediaFormat::Wav | MediaFormat::Mp3 => MediaKind::Audio,
        }
    }

    /// 供解码器使用的扩展名提示
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Wav => "wav",
            MediaFormat::Mp3 => "mp3",
        }
    }

    /// 根据文件头识别音频容器
    pub fn sniff_audio(bytes: &[u8]) -> Option<MediaFormat> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Some(MediaFormat::Wav);
        }
        if bytes.starts_with(b"ID3") {
            return Some(MediaFormat::Mp3);
        }
        // MPEG帧同步字
        if bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0 {
            return Some(MediaFormat::Mp3);
        }
        None
    }

    fn looks_like_other_audio(bytes: &[u8]) -> bool {
        bytes.starts_with(b"fLaC") || bytes.starts_with(b"OggS") || bytes.starts_with(b"FORM")
    }
}

/// 单次请求内的上传文件
#[derive(Debug, Clone)]
pub struct RawMediaInput {
    pub kind: MediaKind,
    pub format: MediaFormat,
    pub bytes: Bytes,
}

impl RawMediaInput {
    /// 校验上传内容并识别格式
    ///
    /// 格式以文件内容为准；声明的Content-Type只用于排除错误的媒体类别。
    pub fn new(kind: MediaKind, bytes: Bytes, declared_type: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EmotionError::InvalidInput(format!("Empty {} file", kind)));
        }

        if let Some(content_type) = declared_type {
            let expected_prefix = format!("{}/", kind);
            let generic = content_type.starts_with("application/octet-stream");
            if !generic && !content_type.starts_with(&expected_prefix) {
                return Err(EmotionError::UnsupportedFormat(format!(
                    "{} upload declared as {}",
                    kind, content_type
                )));
            }
        }

        let format = match kind {
            MediaKind::Image => Self::detect_image(&bytes)?,
            MediaKind::Audio => Self::detect_audio(&bytes)?,
        };

        Ok(Self { kind, format, bytes })
    }

    fn detect_image(bytes: &[u8]) -> Result<MediaFormat> {
        match ImageLoader::detect_format(bytes) {
            Some(image::ImageFormat::Jpeg) => Ok(MediaFormat::Jpeg),
            Some(image::ImageFormat::Png) => Ok(MediaFormat::Png),
            Some(other) => Err(EmotionError::UnsupportedFormat(format!(
                "image format {:?} is not accepted, use JPEG or PNG",
                other
            ))),
            None => Err(EmotionError::Decode(
                "image bytes are not a recognizable raster image".to_string(),
            )),
        }
    }

    fn detect_audio(bytes: &[u8]) -> Result<MediaFormat> {
        if let Some(format) = MediaFormat::sniff_audio(bytes) {
            return Ok(format);
        }
        if MediaFormat::looks_like_other_audio(bytes) {
            return Err(EmotionError::UnsupportedFormat(
                "audio container is not accepted, use WAV or MP3".to_string(),
            ));
        }
        Err(EmotionError::Decode(
            "audio bytes are not a recognizable audio container".to_string(),
        ))
    }
}

/// 模型输入特征
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTensor {
    /// (H, W, 3)，取值范围 [0, 1]
    Image(Array3<f32>),
    /// 时间轴平均后的MFCC系数
    Audio(Array1<f32>),
}

impl FeatureTensor {
    pub fn kind(&self) -> MediaKind {
        match self {
            FeatureTensor::Image(_) => MediaKind::Image,
            FeatureTensor::Audio(_) => MediaKind::Audio,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            FeatureTensor::Image(array) => array.shape().to_vec(),
            FeatureTensor::Audio(array) => array.shape().to_vec(),
        }
    }
}

/// 模型输出的分数向量，长度与标签集合一致
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    label_set: LabelSet,
    scores: Vec<f32>,
}

impl ScoreVector {
    pub fn new(label_set: LabelSet, scores: Vec<f32>) -> Result<Self> {
        if scores.len() != label_set.len() {
            return Err(EmotionError::LabelSetMismatch(format!(
                "{} scores for label set '{}' with {} labels",
                scores.len(),
                label_set.name(),
                label_set.len()
            )));
        }
        Ok(Self { label_set, scores })
    }

    pub fn label_set(&self) -> LabelSet {
        self.label_set
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// 预测来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Image,
    Audio,
    Fused,
}

impl From<MediaKind> for PredictionSource {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => PredictionSource::Image,
            MediaKind::Audio => PredictionSource::Audio,
        }
    }
}

/// 单个模态（或融合）的预测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub source: PredictionSource,
    pub label: String,
    pub index: usize,
    /// 百分比，保留两位小数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub label_set: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f32>>,
}

/// 分析选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AnalysisOptions {
    /// 两个模态都存在时输出融合结果
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

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            fuse: false,
            include_confidence: true,
            include_scores: false,
        }
    }
}

/// 一次分析请求
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub image: Option<RawMediaInput>,
    pub audio: Option<RawMediaInput>,
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.audio.is_none()
    }
}

/// 完整的分析结果
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fused: Option<Prediction>,
    pub stats: AnalysisStats,
}

/// 处理统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub total_time_ms: u64,
    pub image_time_ms: u64,
    pub audio_time_ms: u64,
}
