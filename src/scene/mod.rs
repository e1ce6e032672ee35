pub mod generator;
pub mod store;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use generator::SceneGenerator;
pub use store::SceneStore;
pub use validate::validate_scene_format;

/// 表示一个学习场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// 场景编号（不保证唯一）
    #[serde(default)]
    pub id: u64,
    /// 标题
    pub title: String,
    /// 场景描述
    pub description: String,
    /// 按说话顺序排列的对话
    pub dialog: Vec<DialogLine>,
    /// 与 dialog 按位置对应的翻译
    pub translation: Vec<String>,
}

/// 一句对话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogLine {
    /// 说话人标签，例如 "A"、"B"
    pub speaker: String,
    /// 原文，同时用于语音合成
    pub text: String,
    /// 拼音
    pub pingyin: String,
}

impl Scene {
    /// 第 index 句对话对应的翻译，缺失时返回 None
    pub fn translation_for(&self, index: usize) -> Option<&str> {
        self.translation.get(index).map(String::as_str)
    }
}

impl DialogLine {
    pub fn new(
        speaker: impl Into<String>,
        text: impl Into<String>,
        pingyin: impl Into<String>,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            pingyin: pingyin.into(),
        }
    }
}
