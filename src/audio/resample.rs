use crate::utils::error::EmotionError;
use crate::Result;
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;

/// 单声道重采样
///
/// 输出长度固定为 ceil(len × to / from)，并去除重采样器自身的延迟，
/// 保证同一段内容在不同原始采样率下时间轴对齐。
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(EmotionError::InvalidInput(format!(
            "Invalid sample rate conversion {} -> {}",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected_len =
        ((samples.len() as u64 * to_rate as u64 + from_rate as u64 - 1) / from_rate as u64) as usize;

    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)
        .map_err(|e| EmotionError::Internal(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);
    let mut position = 0;

    while samples.len() - position >= resampler.input_frames_next() {
        let frames = resampler.input_frames_next();
        let chunk = [&samples[position..position + frames]];
        let processed = resampler
            .process(&chunk[..], None)
            .map_err(|e| EmotionError::Internal(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&processed[0]);
        position += frames;
    }

    if position < samples.len() {
        let tail = [&samples[position..]];
        let processed = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| EmotionError::Internal(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&processed[0]);
    }

    // 冲刷内部缓冲，直到覆盖延迟与目标长度
    while output.len() < expected_len + delay {
        let processed = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| EmotionError::Internal(format!("Resampling failed: {}", e)))?;
        if processed[0].is_empty() {
            break;
        }
        output.extend_from_slice(&processed[0]);
    }

    let mut aligned: Vec<f32> = output.into_iter().skip(delay).take(expected_len).collect();
    aligned.resize(expected_len, 0.0);

    tracing::debug!(
        "Resampled {} samples {} Hz -> {} samples {} Hz",
        samples.len(),
        from_rate,
        aligned.len(),
        to_rate
    );

    Ok(aligned)
}
