pub mod decision;
pub mod labels;
pub mod pipeline;
pub mod types;

pub use decision::Decision;
pub use labels::{LabelSet, LabelSetKind, AUDIO_LABELS, IMAGE_LABELS, SHARED_LABELS};
pub use pipeline::EmotionPipeline;
pub use types::{
    AnalysisOptions, AnalysisRequest, AnalysisResult, AnalysisStats, FeatureTensor, MediaFormat,
    MediaKind, Prediction, PredictionSource, RawMediaInput, ScoreVector,
};
