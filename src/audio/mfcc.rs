//! MFCC特征提取
//!
//! 与librosa默认参数一致：居中分帧（两端补零）、周期Hann窗、功率谱、
//! Slaney梅尔滤波器组、转dB后以峰值下80 dB为下限、正交DCT-II。

use crate::utils::error::EmotionError;
use crate::Result;
use ndarray::{Array1, Array2, Axis};
use rustdct::{DctPlanner, TransformType2And3};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

const AMIN: f32 = 1e-10;

/// MFCC参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// `None` 表示不限制动态范围
    pub top_db: Option<f32>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            n_mfcc: 40,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            top_db: Some(80.0),
        }
    }
}

/// 预先计算好的窗函数、滤波器组与变换计划
pub struct Mfcc {
    config: MfccConfig,
    window: Vec<f32>,
    mel_basis: Array2<f32>,
    fft: Arc<dyn Fft<f32>>,
    dct: Arc<dyn TransformType2And3<f32>>,
}

impl std::fmt::Debug for Mfcc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mfcc").field("config", &self.config).finish()
    }
}

impl Mfcc {
    pub fn new(config: MfccConfig) -> Result<Self> {
        if config.n_fft < 2 || config.hop_length == 0 || config.n_mels == 0 {
            return Err(EmotionError::Config(
                "MFCC requires n_fft >= 2 and positive hop_length and n_mels".to_string(),
            ));
        }
        if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
            return Err(EmotionError::Config(format!(
                "n_mfcc must be in 1..={}, got {}",
                config.n_mels, config.n_mfcc
            )));
        }
        if config.sample_rate == 0 {
            return Err(EmotionError::Config("MFCC sample rate must be positive".to_string()));
        }

        let window = hann_window(config.n_fft);
        let mel_basis = mel_filterbank(config.sample_rate, config.n_fft, config.n_mels);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);
        let dct = DctPlanner::<f32>::new().plan_dct2(config.n_mels);

        Ok(Self {
            config,
            window,
            mel_basis,
            fft,
            dct,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// 系数矩阵，形状 (n_mfcc, frames)
    pub fn compute(&self, samples: &[f32]) -> Result<Array2<f32>> {
        if samples.is_empty() {
            return Err(EmotionError::EmptySignal("no samples to analyze".to_string()));
        }

        let power = self.power_spectrogram(samples);
        let mel = self.mel_basis.dot(&power);
        let log_mel = self.power_to_db(mel);

        let frames = log_mel.ncols();
        let mut mfcc = Array2::<f32>::zeros((self.config.n_mfcc, frames));
        let mut buffer = vec![0.0f32; self.config.n_mels];

        for (t, column) in log_mel.axis_iter(Axis(1)).enumerate() {
            buffer.iter_mut().zip(column.iter()).for_each(|(b, &v)| *b = v);
            self.dct_ortho(&mut buffer);
            for k in 0..self.config.n_mfcc {
                mfcc[[k, t]] = buffer[k];
            }
        }

        Ok(mfcc)
    }

    /// 每个系数在所有帧上的平均值
    pub fn mean_over_time(&self, samples: &[f32]) -> Result<Array1<f32>> {
        let mfcc = self.compute(samples)?;
        mfcc.mean_axis(Axis(1))
            .ok_or_else(|| EmotionError::EmptySignal("no frames to average".to_string()))
    }

    /// 功率谱 |STFT|²，形状 (1 + n_fft/2, frames)
    fn power_spectrogram(&self, samples: &[f32]) -> Array2<f32> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let pad = n_fft / 2;

        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = 1 + (padded.len() - n_fft) / hop;
        let n_bins = n_fft / 2 + 1;
        let mut power = Array2::<f32>::zeros((n_bins, n_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

        for t in 0..n_frames {
            let frame = &padded[t * hop..t * hop + n_fft];
            for ((b, &x), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *b = Complex::new(x * w, 0.0);
            }
            self.fft.process(&mut buffer);
            for k in 0..n_bins {
                power[[k, t]] = buffer[k].norm_sqr();
            }
        }

        power
    }

    fn power_to_db(&self, mel: Array2<f32>) -> Array2<f32> {
        let mut log_spec = mel.mapv(|v| 10.0 * v.max(AMIN).log10());

        if let Some(top_db) = self.config.top_db {
            let peak = log_spec.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let floor = peak - top_db;
            log_spec.mapv_inplace(|v| v.max(floor));
        }

        log_spec
    }

    /// 原地正交DCT-II
    fn dct_ortho(&self, buffer: &mut [f32]) {
        self.dct.process_dct2(buffer);

        let n = buffer.len() as f32;
        let first = (1.0 / n).sqrt();
        let rest = (2.0 / n).sqrt();
        for (k, v) in buffer.iter_mut().enumerate() {
            *v *= if k == 0 { first } else { rest };
        }
    }
}

/// 周期Hann窗
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_sp * mel
    }
}

/// [0, sr/2] 上的Slaney归一化三角滤波器，形状 (n_mels, 1 + n_fft/2)
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let f_max = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * f_max / (n_bins - 1) as f64)
        .collect();

    let mel_max = hz_to_mel(f_max);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let enorm = 2.0 / (right - left);

        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }

    weights
}
