use axum::body::Bytes;
use cat_emotion::{
    audio::{AudioFeatureExtractor, MfccConfig},
    emotion::{
        Decision, FeatureTensor, MediaFormat, MediaKind, PredictionSource, RawMediaInput, ScoreVector,
        IMAGE_LABELS,
    },
    image::ImageFeatureExtractor,
    EmotionError,
};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

fn cat_photo(width: u32, height: u32) -> Bytes {
    let image = RgbImage::from_fn(width, height, |x, y| {
        let fur = ((x / 10 + y / 15) % 2) as u8;
        image::Rgb([180 + fur * 50, 120 + fur * 40, 60])
    });
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
    Bytes::from(buffer.into_inner())
}

fn recording(rate: u32, seconds: f32, bits: u16) -> Bytes {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };
    let scale = ((1i64 << (bits - 1)) - 1) as f32;
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
        let n = (rate as f32 * seconds) as usize;
        let mut seed: u32 = 7;
        for i in 0..n {
            let t = i as f32 / rate as f32;
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let noise = ((seed >> 16) & 0x7fff) as f32 / 32768.0 - 0.5;
            let tone = (2.0 * std::f32::consts::PI * 520.0 * t).sin() * 0.4
                + (2.0 * std::f32::consts::PI * 1040.0 * t).sin() * 0.2;
            let value = ((tone + noise * 0.1) * scale) as i32;
            writer.write_sample(value).unwrap();
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    Bytes::from(buffer.into_inner())
}

fn mfcc(extractor: &AudioFeatureExtractor, bytes: Bytes) -> Vec<f32> {
    let input = RawMediaInput::new(MediaKind::Audio, bytes, Some("audio/x-wav")).unwrap();
    match extractor.extract(&input).unwrap() {
        FeatureTensor::Audio(values) => values.to_vec(),
        _ => panic!("expected audio features"),
    }
}

#[test]
fn cat_photo_to_angry_prediction() {
    let input = RawMediaInput::new(MediaKind::Image, cat_photo(300, 450), Some("image/jpeg")).unwrap();
    let features = ImageFeatureExtractor::new(224).extract(&input).unwrap();

    assert_eq!(features.shape(), vec![224, 224, 3]);
    match &features {
        FeatureTensor::Image(array) => assert!(array.iter().all(|v| (0.0..=1.0).contains(v))),
        _ => panic!("expected image features"),
    }

    let scores = ScoreVector::new(IMAGE_LABELS, vec![0.1, 0.05, 0.6, 0.05, 0.05, 0.05, 0.1]).unwrap();
    let prediction = Decision::decide(&scores, PredictionSource::Image, true, false).unwrap();
    assert_eq!(prediction.label, "Angry");
    assert_eq!(prediction.confidence, Some(60.0));
}

#[test]
fn stereo_recording_yields_forty_coefficients_at_any_bit_depth() {
    let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();

    let pcm16 = mfcc(&extractor, recording(44100, 2.0, 16));
    let pcm24 = mfcc(&extractor, recording(44100, 2.0, 24));

    assert_eq!(pcm16.len(), 40);
    assert_eq!(pcm24.len(), 40);
    for (a, b) in pcm16.iter().zip(&pcm24) {
        assert!((a - b).abs() < 0.5, "{} vs {}", a, b);
    }
}

#[test]
fn header_only_wav_is_an_empty_signal() {
    let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
    let input = RawMediaInput::new(MediaKind::Audio, recording(16000, 0.0, 16), None).unwrap();

    let err = extractor.extract(&input).unwrap_err();
    assert!(matches!(err, EmotionError::EmptySignal(_)), "got {:?}", err);
}

#[test]
fn tagged_mp3_upload_yields_forty_coefficients() {
    let extractor = AudioFeatureExtractor::new(MfccConfig::default(), None).unwrap();
    let bytes = Bytes::from_static(include_bytes!("data/purr_44k_mono.mp3"));
    let input = RawMediaInput::new(MediaKind::Audio, bytes, Some("audio/mpeg")).unwrap();
    assert_eq!(input.format, MediaFormat::Mp3);

    match extractor.extract(&input).unwrap() {
        FeatureTensor::Audio(values) => {
            assert_eq!(values.len(), 40);
            assert!(values.iter().all(|v| v.is_finite()));
        }
        _ => panic!("expected audio features"),
    }
}
