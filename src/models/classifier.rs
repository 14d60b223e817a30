use crate::emotion::labels::LabelSet;
use crate::emotion::types::{FeatureTensor, MediaKind, ScoreVector};
use crate::models::InferenceService;
use crate::utils::error::EmotionError;
use crate::{Config, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 基于ONNX Runtime的情绪分类模型
///
/// 图像输入为 NHWC `[1, H, W, 3]`，音频输入为 `[1, 1, n_mfcc]`。
pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    modality: MediaKind,
    label_set: LabelSet,
    input_name: String,  // 动态发现的输入名称
    output_name: String, // 动态发现的输出名称
    model_path: PathBuf,
}

impl OnnxClassifier {
    pub fn new(
        config: &Config,
        model_path: &Path,
        modality: MediaKind,
        label_set: LabelSet,
    ) -> Result<Self> {
        if !model_path.exists() {
            return Err(EmotionError::ModelUnavailable(format!(
                "{} model not found: {}",
                modality,
                model_path.display()
            )));
        }

        tracing::info!("Loading {} model from: {}", modality, model_path.display());

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(Self::optimization_level(config)))
            .and_then(|b| b.with_intra_threads(config.onnx_config.intra_threads))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                EmotionError::ModelUnavailable(format!(
                    "failed to load {} model {}: {}",
                    modality,
                    model_path.display(),
                    e
                ))
            })?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(EmotionError::ModelUnavailable(format!(
                    "{} model has no inputs",
                    modality
                )))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(EmotionError::ModelUnavailable(format!(
                    "{} model has no outputs",
                    modality
                )))
            }
        };

        tracing::info!(
            "{} model bound to label set '{}': input '{}', output '{}'",
            modality,
            label_set.name(),
            input_name,
            output_name
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("{} output[{}]: '{}'", modality, i, output.name);
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            modality,
            label_set,
            input_name,
            output_name,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn modality(&self) -> MediaKind {
        self.modality
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn optimization_level(config: &Config) -> GraphOptimizationLevel {
        match config.onnx_config.optimization_level {
            0 => GraphOptimizationLevel::Disable,
            1 => GraphOptimizationLevel::Level1,
            2 => GraphOptimizationLevel::Level2,
            _ => GraphOptimizationLevel::Level3,
        }
    }

    /// 加上batch维度，转成模型需要的布局
    fn to_model_input(&self, features: &FeatureTensor) -> Result<ArrayD<f32>> {
        if features.kind() != self.modality {
            return Err(EmotionError::InvalidInput(format!(
                "{} model cannot score {} features",
                self.modality,
                features.kind()
            )));
        }

        let input = match features {
            FeatureTensor::Image(array) => array.clone().insert_axis(Axis(0)).into_dyn(),
            FeatureTensor::Audio(array) => {
                let n = array.len();
                array
                    .clone()
                    .into_shape_with_order(IxDyn(&[1, 1, n]))
                    .map_err(|e| EmotionError::Internal(format!("Failed to reshape MFCC: {}", e)))?
            }
        };

        Ok(input)
    }
}

impl InferenceService for OnnxClassifier {
    fn label_set(&self) -> LabelSet {
        self.label_set
    }

    fn score(&self, features: &FeatureTensor) -> Result<ScoreVector> {
        let input = self.to_model_input(features)?;
        tracing::debug!("Running {} model on input {:?}", self.modality, input.shape());

        let input_tensor = Tensor::from_array(input)?;
        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(EmotionError::Inference(format!(
                        "{} output '{}' not found. Available outputs: {:?}",
                        self.modality, self.output_name, available_outputs
                    )));
                }
            }
        };

        // batch为1，展平即为分数向量
        let scores: Vec<f32> = predictions.iter().copied().collect();
        if scores.len() != self.label_set.len() {
            return Err(EmotionError::Inference(format!(
                "{} model produced {} scores but label set '{}' has {} labels",
                self.modality,
                scores.len(),
                self.label_set.name(),
                self.label_set.len()
            )));
        }

        ScoreVector::new(self.label_set, scores)
    }

    fn name(&self) -> &str {
        self.modality.as_str()
    }
}
