use crate::emotion::types::{Prediction, PredictionSource, ScoreVector};
use crate::utils::error::EmotionError;
use crate::Result;

/// 标签选择与多模态融合
pub struct Decision;

impl Decision {
    /// 最大分数所在索引；并列时取最小索引
    ///
    /// NaN永远不会被选中，全部为NaN或空向量时返回None。
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;

        for (i, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((i, score)),
            }
        }

        best.map(|(i, _)| i)
    }

    /// 置信度 = max / sum × 100，保留两位小数
    pub fn confidence(scores: &[f32]) -> f32 {
        let sum: f64 = scores.iter().map(|&s| s as f64).sum();
        if !sum.is_finite() || sum <= 0.0 {
            return 0.0;
        }

        let max = match Self::argmax(scores) {
            Some(i) => scores[i] as f64,
            None => return 0.0,
        };

        let percent = (max / sum * 100.0).clamp(0.0, 100.0);
        ((percent * 100.0).round() / 100.0) as f32
    }

    /// 逐元素平均两个分数向量
    pub fn fuse(first: &ScoreVector, second: &ScoreVector) -> Result<ScoreVector> {
        let (a, b) = (first.label_set(), second.label_set());
        if first.len() != second.len() || !a.is_compatible_with(&b) {
            return Err(EmotionError::LabelSetMismatch(format!(
                "cannot fuse '{}' ({} labels) with '{}' ({} labels)",
                a.name(),
                first.len(),
                b.name(),
                second.len()
            )));
        }

        let averaged = first
            .scores()
            .iter()
            .zip(second.scores())
            .map(|(x, y)| (x + y) / 2.0)
            .collect();

        ScoreVector::new(a, averaged)
    }

    /// 从分数向量得到预测
    pub fn decide(
        scores: &ScoreVector,
        source: PredictionSource,
        include_confidence: bool,
        include_scores: bool,
    ) -> Result<Prediction> {
        let label_set = scores.label_set();
        let index = Self::argmax(scores.scores()).ok_or_else(|| {
            EmotionError::Inference(format!(
                "no selectable score in {} vector for '{}'",
                scores.len(),
                label_set.name()
            ))
        })?;

        let label = label_set.label(index).ok_or_else(|| {
            EmotionError::LabelSetMismatch(format!(
                "index {} outside label set '{}'",
                index,
                label_set.name()
            ))
        })?;

        Ok(Prediction {
            source,
            label: label.to_string(),
            index,
            confidence: include_confidence.then(|| Self::confidence(scores.scores())),
            label_set: label_set.name(),
            scores: include_scores.then(|| scores.scores().to_vec()),
        })
    }
}
