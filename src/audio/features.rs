use crate::audio::decoder::{AudioDecoder, DecodedAudio};
use crate::audio::mfcc::{Mfcc, MfccConfig};
use crate::audio::resample::resample;
use crate::emotion::types::{FeatureTensor, MediaKind, RawMediaInput};
use crate::utils::error::EmotionError;
use crate::Result;

/// 音频特征提取器
///
/// 解码 → 混为单声道 → （可选）截取开头 → 重采样 → MFCC → 时间轴平均。
/// 截取策略对所有请求路径一致。
#[derive(Debug)]
pub struct AudioFeatureExtractor {
    mfcc: Mfcc,
    max_seconds: Option<f32>,
}

impl AudioFeatureExtractor {
    pub fn new(config: MfccConfig, max_seconds: Option<f32>) -> Result<Self> {
        if let Some(seconds) = max_seconds {
            if !(seconds > 0.0) {
                return Err(EmotionError::Config(format!(
                    "max audio duration must be positive, got {}",
                    seconds
                )));
            }
        }

        Ok(Self {
            mfcc: Mfcc::new(config)?,
            max_seconds,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.mfcc.config().sample_rate
    }

    pub fn n_mfcc(&self) -> usize {
        self.mfcc.config().n_mfcc
    }

    pub fn max_seconds(&self) -> Option<f32> {
        self.max_seconds
    }

    pub fn extract(&self, input: &RawMediaInput) -> Result<FeatureTensor> {
        if input.kind != MediaKind::Audio {
            return Err(EmotionError::InvalidInput(format!(
                "audio extractor received {} input",
                input.kind
            )));
        }

        let decoded = AudioDecoder::decode(&input.bytes, input.format)?;
        self.extract_decoded(decoded)
    }

    pub fn extract_decoded(&self, mut audio: DecodedAudio) -> Result<FeatureTensor> {
        if audio.samples.is_empty() {
            return Err(EmotionError::EmptySignal("decoded waveform has zero length".to_string()));
        }

        if let Some(seconds) = self.max_seconds {
            audio.truncate_to(seconds);
        }

        tracing::debug!(
            "Extracting MFCC from {:.2}s of audio at {} Hz",
            audio.duration_secs(),
            audio.sample_rate
        );

        let samples = resample(&audio.samples, audio.sample_rate, self.sample_rate())?;
        if samples.is_empty() {
            return Err(EmotionError::EmptySignal("no samples left after resampling".to_string()));
        }

        let coefficients = self.mfcc.mean_over_time(&samples)?;
        Ok(FeatureTensor::Audio(coefficients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use ndarray::Array1;
    use std::f32::consts::PI;
    use std::io::Cursor;

    /// 带颤音的谐波叠加少量伪随机噪声
    fn meow(rate: u32, seconds: f32) -> Vec<f32> {
        let n = (rate as f32 * seconds) as usize;
        let mut seed: u32 = 0x1234_5678;
        (0..n)
            .map(|i| {
                let t = i as f32 / rate as f32;
                let f0 = 600.0 + 80.0 * (2.0 * PI * 3.0 * t).sin();
                let tone: f32 = (1..=4)
                    .map(|h| (2.0 * PI * f0 * h as f32 * t).sin() / h as f32)
                    .sum();
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (seed >> 8) as f32 / (1u32 << 24) as f32 - 0.5;
                0.3 * tone + 0.05 * noise
            })
            .collect()
    }

    fn wav_16bit(samples: &[f32], rate: u32) -> Bytes {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
            for &s in samples {
                writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        Bytes::from(buffer.into_inner())
    }

    fn wav_float(samples: &[f32], rate: u32) -> Bytes {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        Bytes::from(buffer.into_inner())
    }

    fn coefficients(extractor: &AudioFeatureExtractor, bytes: Bytes) -> Array1<f32> {
        let input = RawMediaInput::new(MediaKind::Audio, bytes, Some("audio/wav")).unwrap();
        match extractor.extract(&input).unwrap() {
            FeatureTensor::Audio(array) => array,
            other => panic!("expected audio tensor, got {:?}", other.kind()),
        }
    }

    #[test]
    fn two_second_wav_yields_forty_coefficients() {
        let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
        let features = coefficients(&extractor, wav_16bit(&meow(44100, 2.0), 44100));

        assert_eq!(features.len(), 40);
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn length_is_independent_of_duration_and_rate() {
        let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
        for (rate, seconds) in [(8000, 0.05), (16000, 1.0), (22050, 4.5), (48000, 0.3)] {
            let features = coefficients(&extractor, wav_16bit(&meow(rate, seconds), rate));
            assert_eq!(features.len(), 40, "{} Hz, {} s", rate, seconds);
        }
    }

    #[test]
    fn re_encoding_keeps_features_close() {
        let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
        let signal = meow(44100, 2.0);

        let pcm16 = coefficients(&extractor, wav_16bit(&signal, 44100));
        let float = coefficients(&extractor, wav_float(&signal, 44100));

        let max_diff = pcm16
            .iter()
            .zip(float.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 0.5, "max coefficient difference {}", max_diff);
    }

    #[test]
    fn empty_wav_is_an_empty_signal() {
        let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
        let input = RawMediaInput::new(MediaKind::Audio, wav_16bit(&[], 16000), None).unwrap();

        let err = extractor.extract(&input).unwrap_err();
        assert!(matches!(err, EmotionError::EmptySignal(_)), "got {:?}", err);
    }

    #[test]
    fn duration_cap_only_looks_at_leading_audio() {
        let capped = AudioFeatureExtractor::new(MfccConfig::default(), Some(1.0)).unwrap();
        let uncapped = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();

        let mut long = meow(16000, 1.0);
        let head = long.clone();
        long.extend(std::iter::repeat(0.9).take(32000));

        let from_long = coefficients(&capped, wav_16bit(&long, 16000));
        let from_head = coefficients(&uncapped, wav_16bit(&head, 16000));
        assert_eq!(from_long, from_head);
    }

    #[test]
    fn non_positive_cap_is_rejected() {
        assert!(AudioFeatureExtractor::new(MfccConfig::default(), Some(0.0)).is_err());
    }
}
