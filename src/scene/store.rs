use crate::error::{AppError, Result};
use crate::scene::Scene;
use std::path::{Path, PathBuf};
use tracing::info;

/// 内存中的场景列表，启动时从静态 JSON 文件加载
#[derive(Debug, Clone)]
pub struct SceneStore {
    path: PathBuf,
    scenes: Vec<Scene>,
}

impl SceneStore {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let load_error = |reason: String| AppError::Load {
            path: path.display().to_string(),
            reason,
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| load_error(e.to_string()))?;
        let scenes: Vec<Scene> =
            serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        info!("Loaded {} scenes from {}", scenes.len(), path.display());
        Ok(Self { path, scenes })
    }

    #[cfg(test)]
    pub fn from_scenes(path: impl Into<PathBuf>, scenes: Vec<Scene>) -> Self {
        Self {
            path: path.into(),
            scenes,
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn get(&self, row: usize) -> Option<&Scene> {
        self.scenes.get(row)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// 追加一个场景并分配新的编号（当前最大编号 + 1），返回该编号
    pub fn append(&mut self, mut scene: Scene) -> u64 {
        let next_id = self.scenes.iter().map(|s| s.id).max().map_or(1, |max| max + 1);
        scene.id = next_id;
        self.scenes.push(scene);
        next_id
    }

    /// 撤销最近一次追加
    pub fn pop(&mut self) -> Option<Scene> {
        self.scenes.pop()
    }

    /// 把当前列表写回 JSON 文件
    pub async fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.scenes)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Saved {} scenes to {}", self.scenes.len(), self.path.display());
        Ok(())
    }
}
