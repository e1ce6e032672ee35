//! 场景列表和详情的视图模型
//!
//! 视图只是状态的纯函数：每次重新渲染都从场景数据完整构建，不保留上一次的内容。

use crate::scene::Scene;
use crate::speech::{SpeakerVoices, VoiceGender};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub scene_id: u64,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListView {
    pub rows: Vec<ListRow>,
}

impl ListView {
    /// 每个场景一行，顺序与输入一致；最多一行被选中
    pub fn render(scenes: &[Scene], selected_row: Option<usize>) -> Self {
        let rows = scenes
            .iter()
            .enumerate()
            .map(|(row, scene)| ListRow {
                scene_id: scene.id,
                title: scene.title.clone(),
                selected: selected_row == Some(row),
            })
            .collect();
        Self { rows }
    }

    #[cfg(test)]
    pub fn selected_row(&self) -> Option<usize> {
        self.rows.iter().position(|row| row.selected)
    }
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "(no scenes)");
        }
        for (i, row) in self.rows.iter().enumerate() {
            let marker = if row.selected { '>' } else { ' ' };
            writeln!(f, "{} {:>2}. {} (#{})", marker, i + 1, row.title, row.scene_id)?;
        }
        Ok(())
    }
}

/// 播放按钮携带的信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayControl {
    pub index: usize,
    pub gender: VoiceGender,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry {
    pub speaker: String,
    pub text: String,
    pub pingyin: String,
    /// 缺失的翻译显示为空
    pub translation: Option<String>,
    pub play: PlayControl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub title: String,
    pub description: String,
    pub entries: Vec<DialogEntry>,
}

impl DetailView {
    pub fn render(scene: &Scene, speakers: &SpeakerVoices) -> Self {
        let entries = scene
            .dialog
            .iter()
            .enumerate()
            .map(|(index, line)| DialogEntry {
                speaker: line.speaker.clone(),
                text: line.text.clone(),
                pingyin: line.pingyin.clone(),
                translation: scene.translation_for(index).map(str::to_string),
                play: PlayControl {
                    index,
                    gender: speakers.gender_for(&line.speaker),
                },
            })
            .collect();

        Self {
            title: scene.title.clone(),
            description: scene.description.clone(),
            entries,
        }
    }

    pub fn play_control(&self, index: usize) -> Option<PlayControl> {
        self.entries.get(index).map(|entry| entry.play)
    }
}

impl fmt::Display for DetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.description)?;
        writeln!(f)?;
        for entry in &self.entries {
            writeln!(f, "[{}] {}: {}", entry.play.index + 1, entry.speaker, entry.text)?;
            writeln!(f, "    {}", entry.pingyin)?;
            writeln!(f, "    {}", entry.translation.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }
}
