use serde::Serialize;

/// 有序情绪标签集合
///
/// 标签顺序即模型输出维度顺序，是与推理服务之间的索引契约。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    name: &'static str,
    labels: &'static [&'static str],
}

/// 图像模型的7类标签
pub const IMAGE_LABELS: LabelSet = LabelSet {
    name: "image7",
    labels: &["Happy", "Sad", "Angry", "Surprised", "Scared", "Disgusted", "Normal"],
};

/// 音频模型的10类标签
pub const AUDIO_LABELS: LabelSet = LabelSet {
    name: "audio10",
    labels: &[
        "Happy",
        "Angry",
        "Paining",
        "Resting",
        "Warning",
        "Fighting",
        "Mating",
        "Defense",
        "HuntingMind",
        "MotherCall",
    ],
};

/// 图像与音频共用的4类标签（融合模式）
pub const SHARED_LABELS: LabelSet = LabelSet {
    name: "shared4",
    labels: &["Happy", "Angry", "Sad", "Relaxed"],
};

impl LabelSet {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&'static str> {
        self.labels.get(index).copied()
    }

    /// 内容与顺序完全一致时才可直接比较分数
    pub fn is_compatible_with(&self, other: &LabelSet) -> bool {
        self.labels == other.labels
    }
}

/// 启动时为每个模型选择的标签集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LabelSetKind {
    Image7,
    Audio10,
    Shared4,
}

impl LabelSetKind {
    pub fn label_set(self) -> LabelSet {
        match self {
            LabelSetKind::Image7 => IMAGE_LABELS,
            LabelSetKind::Audio10 => AUDIO_LABELS,
            LabelSetKind::Shared4 => SHARED_LABELS,
        }
    }
}
