//! 基于Symphonia的音频解码

use crate::emotion::types::MediaFormat;
use crate::utils::error::EmotionError;
use crate::Result;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// 解码后的单声道波形
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// 只保留开头的 `seconds` 秒
    pub fn truncate_to(&mut self, seconds: f32) {
        let max_samples = (seconds.max(0.0) as f64 * self.sample_rate as f64) as usize;
        self.samples.truncate(max_samples);
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    /// 解码内存中的WAV/MP3数据，多声道取平均混为单声道
    pub fn decode(bytes: &[u8], format: MediaFormat) -> Result<DecodedAudio> {
        let source = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(format.extension());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| EmotionError::Decode(format!("Failed to open {:?} stream: {}", format, e)))?;

        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EmotionError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| EmotionError::Decode("Unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| EmotionError::Decode(format!("Unsupported codec: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    Self::end_of_stream(e)?;
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(EmotionError::Decode(format!("Audio decode failed: {}", e)));
                }
            };

            if sample_buf.is_none() {
                let spec = *decoded.spec();
                channels = spec.channels.count().max(1);
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(ref mut buf) = sample_buf {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        tracing::debug!(
            "Decoded {:?}: {} interleaved samples, {} channel(s), {} Hz",
            format,
            samples.len(),
            channels,
            sample_rate
        );

        Ok(DecodedAudio {
            samples: Self::downmix(&samples, channels),
            sample_rate,
        })
    }

    /// 读包错误：流结束返回Ok，其余视为损坏的数据
    fn end_of_stream(err: SymphoniaError) -> Result<()> {
        match err {
            SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            SymphoniaError::ResetRequired => Ok(()),
            other => Err(EmotionError::Decode(format!("Failed to read audio packet: {}", other))),
        }
    }

    /// 交错多声道 -> 单声道
    pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            return interleaved.to_vec();
        }
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
            for &s in frames {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn decodes_mono_wav() {
        let frames: Vec<i16> = (0..800).map(|i| ((i % 100) * 100) as i16).collect();
        let audio = AudioDecoder::decode(&wav_bytes(8000, 1, &frames), MediaFormat::Wav).unwrap();

        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples.len(), 800);
        assert!((audio.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn stereo_is_averaged_to_mono() {
        let frames: Vec<i16> = (0..200).flat_map(|_| [16384i16, -16384i16]).collect();
        let audio = AudioDecoder::decode(&wav_bytes(8000, 2, &frames), MediaFormat::Wav).unwrap();

        assert_eq!(audio.samples.len(), 200);
        assert!(audio.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = AudioDecoder::decode(b"RIFF\0\0\0\0WAVEjunkjunk", MediaFormat::Wav).unwrap_err();
        assert!(matches!(err, EmotionError::Decode(_)));
    }

    #[test]
    fn decodes_id3_tagged_mp3() {
        let bytes = include_bytes!("../../tests/data/purr_44k_mono.mp3");
        assert_eq!(MediaFormat::sniff_audio(bytes), Some(MediaFormat::Mp3));

        let audio = AudioDecoder::decode(bytes, MediaFormat::Mp3).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert!(!audio.samples.is_empty());
        assert!(audio.samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn only_end_of_stream_stops_reading_quietly() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "end of stream");
        assert!(AudioDecoder::end_of_stream(SymphoniaError::IoError(eof)).is_ok());
        assert!(AudioDecoder::end_of_stream(SymphoniaError::ResetRequired).is_ok());

        let broken = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad chunk");
        let err = AudioDecoder::end_of_stream(SymphoniaError::IoError(broken)).unwrap_err();
        assert!(matches!(err, EmotionError::Decode(_)));

        let err = AudioDecoder::end_of_stream(SymphoniaError::DecodeError("bad frame")).unwrap_err();
        assert!(matches!(err, EmotionError::Decode(_)));
    }

    #[test]
    fn truncation_keeps_leading_samples() {
        let mut audio = DecodedAudio {
            samples: (0..1000).map(|i| i as f32).collect(),
            sample_rate: 100,
        };
        audio.truncate_to(3.0);
        assert_eq!(audio.samples.len(), 300);
        assert_eq!(audio.samples[299], 299.0);
    }
}
