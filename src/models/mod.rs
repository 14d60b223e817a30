pub mod classifier;
pub mod manager;

pub use classifier::OnnxClassifier;
pub use manager::{ModelManager, ModelStats};

use crate::emotion::labels::LabelSet;
use crate::emotion::types::{FeatureTensor, ScoreVector};
use crate::Result;

/// 推理服务：特征张量 -> 分数向量
///
/// 启动时加载一次，之后只读地在并发请求间共享。
pub trait InferenceService: Send + Sync {
    /// 输出维度对应的标签集合
    fn label_set(&self) -> LabelSet;

    fn score(&self, features: &FeatureTensor) -> Result<ScoreVector>;

    /// 日志与 /api/info 中使用的名称
    fn name(&self) -> &str {
        self.label_set().name()
    }
}
