use crate::error::GenerateError;
use crate::scene::{Scene, SceneGenerator, SceneStore};
use crate::speech::{SpeakerVoices, SpeechPlayer};
use crate::view::{DetailView, ListView};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 用户操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// 选中列表中的第 n 行（从 0 开始）
    Select(usize),
    /// 播放当前场景的第 n 句（从 0 开始）
    Play(usize),
}

/// 需要展示给用户的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert(String),
    Info(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub row: usize,
    pub scene_id: u64,
}

/// 生成进行中的标记，对应界面上的忙碌提示和禁用的生成按钮
#[derive(Debug, Clone, Default)]
pub struct BusyIndicator(Arc<AtomicBool>);

impl BusyIndicator {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 已经处于忙碌状态时返回 None
    fn engage(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// 析构时释放忙碌标记，无论生成以何种方式结束
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub type PendingScene = Pin<Box<dyn Future<Output = Result<Scene, GenerateError>> + Send>>;

pub struct AppController {
    store: SceneStore,
    player: SpeechPlayer,
    generator: Option<SceneGenerator>,
    speakers: SpeakerVoices,
    persist_generated: bool,
    selected: Option<Selection>,
    displayed: Option<Scene>,
    list: ListView,
    detail: Option<DetailView>,
    busy: BusyIndicator,
}

impl AppController {
    pub fn new(
        store: SceneStore,
        player: SpeechPlayer,
        generator: Option<SceneGenerator>,
        speakers: SpeakerVoices,
        persist_generated: bool,
    ) -> Self {
        let list = ListView::render(store.scenes(), None);
        Self {
            store,
            player,
            generator,
            speakers,
            persist_generated,
            selected: None,
            displayed: None,
            list,
            detail: None,
            busy: BusyIndicator::default(),
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn handle(&mut self, event: AppEvent) -> Option<Notice> {
        match event {
            AppEvent::Select(row) => self.select(row),
            AppEvent::Play(index) => self.play(index),
        }
    }

    fn select(&mut self, row: usize) -> Option<Notice> {
        let Some(scene) = self.store.get(row).cloned() else {
            return Some(Notice::Alert(format!("There is no scene #{}", row + 1)));
        };

        self.selected = Some(Selection {
            row,
            scene_id: scene.id,
        });
        self.list = ListView::render(self.store.scenes(), Some(row));
        self.display_scene(scene);
        None
    }

    fn play(&mut self, index: usize) -> Option<Notice> {
        let (Some(detail), Some(scene)) = (&self.detail, &self.displayed) else {
            return Some(Notice::Alert("Select a scene first.".into()));
        };
        let (Some(control), Some(line)) = (detail.play_control(index), scene.dialog.get(index))
        else {
            return Some(Notice::Alert(format!("There is no line #{}", index + 1)));
        };

        self.player.speak(&line.text, control.gender);
        None
    }

    /// 用新场景替换详情视图
    pub fn display_scene(&mut self, scene: Scene) {
        self.detail = Some(DetailView::render(&scene, &self.speakers));
        self.displayed = Some(scene);
    }

    /// 校验输入并返回尚未执行的生成任务
    ///
    /// 空输入和重复提交会立即被拒绝，不发出网络请求。返回的任务持有忙碌标记，
    /// 完成、出错或被丢弃时都会释放。
    pub fn begin_generate(&self, description: &str) -> Result<PendingScene, GenerateError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(GenerateError::EmptyInput);
        }
        let generator = self.generator.clone().ok_or_else(|| {
            GenerateError::Transport("scene generation is not configured".into())
        })?;
        let guard = self.busy.engage().ok_or(GenerateError::Busy)?;

        let description = description.to_string();
        Ok(Box::pin(async move {
            let _guard = guard;
            generator.generate(&description).await
        }))
    }

    pub async fn finish_generate(&mut self, result: Result<Scene, GenerateError>) -> Notice {
        let scene = match result {
            Ok(scene) => scene,
            Err(e) => return generation_failed(&e),
        };

        let title = scene.title.clone();
        let mut notice = Notice::Info(format!("Generated scene \"{}\"", title));
        if self.persist_generated {
            let id = self.store.append(scene.clone());
            match self.store.persist().await {
                Ok(()) => info!("Added generated scene {} to the scene list", id),
                Err(e) => {
                    // 写盘失败时不保留在列表里，避免重新加载后消失
                    warn!("Failed to save generated scene: {}", e);
                    self.store.pop();
                    notice = Notice::Alert(format!(
                        "Scene \"{}\" is shown but could not be saved.",
                        title
                    ));
                }
            }
            self.list = ListView::render(self.store.scenes(), self.selected.map(|s| s.row));
        }

        self.display_scene(scene);
        notice
    }

    pub async fn generate(&mut self, description: &str) -> Notice {
        match self.begin_generate(description) {
            Ok(pending) => {
                let result = pending.await;
                self.finish_generate(result).await
            }
            Err(e) => generation_failed(&e),
        }
    }

    /// 等待排队中的语音播放完毕
    pub async fn shutdown(self) {
        self.player.shutdown().await;
    }
}

pub fn generation_failed(err: &GenerateError) -> Notice {
    match err {
        GenerateError::EmptyInput | GenerateError::Busy => {}
        _ => error!("Failed to generate the scene: {}", err),
    }
    Notice::Alert(err.user_message().to_string())
}
