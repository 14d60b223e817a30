use crate::audio::MfccConfig;
use crate::emotion::labels::{LabelSet, LabelSetKind};
use crate::web::ui::ThemePreset;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// 请求读取与响应序列化预留的时间（秒）
const REQUEST_TIMEOUT_GRACE: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件目录
    pub models_dir: PathBuf,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,

    /// 特征提取与标签配置
    pub feature_config: FeatureConfig,

    /// 上传页面主题
    pub theme: ThemePreset,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 单次分析（解码 + 推理）超时时间（秒）
    pub inference_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// 图像缩放后的边长
    pub image_size: u32,

    /// 音频重采样目标采样率
    pub sample_rate: u32,

    /// MFCC系数个数
    pub n_mfcc: usize,

    /// 只分析音频开头的若干秒，`None` 表示不截取
    pub max_audio_seconds: Option<f32>,

    pub image_labels: LabelSetKind,
    pub audio_labels: LabelSetKind,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            image_size: 224,
            sample_rate: 16000,
            n_mfcc: 40,
            max_audio_seconds: None,
            image_labels: LabelSetKind::Image7,
            audio_labels: LabelSetKind::Audio10,
        }
    }
}

impl FeatureConfig {
    pub fn image_label_set(&self) -> LabelSet {
        self.image_labels.label_set()
    }

    pub fn audio_label_set(&self) -> LabelSet {
        self.audio_labels.label_set()
    }

    pub fn mfcc_config(&self) -> MfccConfig {
        MfccConfig {
            sample_rate: self.sample_rate,
            n_mfcc: self.n_mfcc,
            ..MfccConfig::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.image_size == 0 {
            bail!("image size must be positive");
        }
        if self.sample_rate == 0 {
            bail!("sample rate must be positive");
        }
        if self.n_mfcc == 0 {
            bail!("n_mfcc must be positive");
        }
        if let Some(seconds) = self.max_audio_seconds {
            if !(seconds > 0.0) {
                bail!("max audio seconds must be positive, got {}", seconds);
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);
        if workers == 0 {
            bail!("worker count must be positive");
        }

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1), // 使用75%的CPU核心
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 }, // 开发模式更长超时
            inference_timeout: if dev_mode { 120 } else { 30 },
            max_request_size: 50 * 1024 * 1024, // 50MB
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            workers,
            dev_mode,
            onnx_config,
            server_config,
            feature_config: FeatureConfig::default(),
            theme: ThemePreset::default(),
        })
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Result<Self> {
        features.validate()?;
        self.feature_config = features;
        Ok(self)
    }

    pub fn with_theme(mut self, theme: ThemePreset) -> Self {
        self.theme = theme;
        self
    }

    /// 覆盖单次分析超时（秒）
    ///
    /// 整个请求的超时至少比分析超时多出 `REQUEST_TIMEOUT_GRACE` 秒，
    /// 保证超时时返回JSON格式的 `TIMEOUT` 而不是空的408。
    pub fn with_inference_timeout(mut self, seconds: u64) -> Result<Self> {
        if seconds == 0 {
            bail!("inference timeout must be positive");
        }
        let server = &mut self.server_config;
        server.inference_timeout = seconds;
        server.request_timeout = server
            .request_timeout
            .max(seconds.saturating_add(REQUEST_TIMEOUT_GRACE));
        Ok(self)
    }

    /// 获取图像模型路径
    pub fn image_model_path(&self) -> PathBuf {
        self.models_dir.join("cat_image_model.onnx")
    }

    /// 获取音频模型路径
    pub fn audio_model_path(&self) -> PathBuf {
        self.models_dir.join("cat_audio_model.onnx")
    }
}
