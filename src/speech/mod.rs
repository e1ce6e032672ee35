//! 语音播放
//!
//! 每次播放时查询可用的合成语音，按语言标签和性别挑选第一个匹配的语音。
//! 语音名称里并没有结构化的性别字段，只能按名称中是否包含 "male"/"female" 判断。

pub mod host;

use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use host::HostSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceGender {
    Male,
    Female,
}

impl VoiceGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceGender::Male => "male",
            VoiceGender::Female => "female",
        }
    }
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceGender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(VoiceGender::Male),
            "female" | "f" => Ok(VoiceGender::Female),
            other => Err(format!("unknown voice gender `{}`", other)),
        }
    }
}

/// 说话人标签到语音性别的映射
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerVoices {
    genders: HashMap<String, VoiceGender>,
    default: VoiceGender,
}

impl SpeakerVoices {
    pub fn new(genders: HashMap<String, VoiceGender>, default: VoiceGender) -> Self {
        Self { genders, default }
    }

    pub fn gender_for(&self, speaker: &str) -> VoiceGender {
        self.genders.get(speaker).copied().unwrap_or(self.default)
    }
}

impl Default for SpeakerVoices {
    /// "A" 为男声，其余为女声
    fn default() -> Self {
        Self::new(
            HashMap::from([("A".to_string(), VoiceGender::Male)]),
            VoiceGender::Female,
        )
    }
}

/// 平台提供的一个合成语音
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// 可读名称，例如 "Microsoft Huihui - Chinese (Simplified, PRC) - female"
    pub name: String,
    /// 语言标签，例如 "zh-CN"
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// 一次待合成的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    /// 说话人对应的性别，后端可据此调整音色
    pub gender: VoiceGender,
    /// None 表示使用系统默认语音
    pub voice: Option<Voice>,
}

/// 比较语言标签，忽略大小写，`_` 与 `-` 视为相同
pub fn locale_matches(a: &str, b: &str) -> bool {
    let normalize = |s: &str| s.trim().replace('_', "-").to_ascii_lowercase();
    normalize(a) == normalize(b)
}

/// 返回第一个语言匹配且名称包含性别关键字的语音
///
/// 注意 "female" 也包含 "male"，男声匹配时可能选中女声名称，这是名称启发式本身的局限。
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str, gender: VoiceGender) -> Option<&'a Voice> {
    voices.iter().find(|v| {
        locale_matches(&v.lang, locale) && v.name.to_lowercase().contains(gender.as_str())
    })
}

/// 生成一次合成请求
///
/// `voice_locale` 是语音列表里使用的语言代码（例如 espeak 的 "cmn"），用于挑选语音；
/// 请求本身的语言标签始终是 `locale`。
pub fn plan_utterance(
    voices: &[Voice],
    text: &str,
    gender: VoiceGender,
    locale: &str,
    voice_locale: &str,
) -> Utterance {
    let voice = if voices.is_empty() {
        warn!("No available voices found.");
        None
    } else {
        let voice = select_voice(voices, voice_locale, gender).cloned();
        if voice.is_none() {
            debug!("No matching voice for locale={} gender={}", voice_locale, gender);
        }
        voice
    };

    Utterance {
        text: text.to_string(),
        lang: locale.to_string(),
        gender,
        voice,
    }
}

/// 语音合成后端
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// 当前可用的语音，可能为空
    fn voices(&self) -> impl Future<Output = Result<Vec<Voice>>> + Send;

    /// 合成并播放，返回时播放已结束
    fn speak(&self, utterance: &Utterance) -> impl Future<Output = Result<()>> + Send;

    /// 语音列表中与 `locale` 对应的语言代码
    fn voice_locale(&self, locale: &str) -> String {
        locale.to_string()
    }
}

struct SpeechRequest {
    text: String,
    gender: VoiceGender,
}

/// 语音播放器
///
/// `speak` 只负责入队，由单个后台任务按先后顺序依次播放，不会打断正在播放的句子。
pub struct SpeechPlayer {
    tx: mpsc::UnboundedSender<SpeechRequest>,
    worker: JoinHandle<()>,
}

impl SpeechPlayer {
    pub fn spawn<S: SpeechSynthesizer>(synthesizer: S, locale: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_queue(synthesizer, locale.into(), rx));
        Self { tx, worker }
    }

    pub fn speak(&self, text: &str, gender: VoiceGender) {
        let request = SpeechRequest {
            text: text.to_string(),
            gender,
        };
        if self.tx.send(request).is_err() {
            warn!("Speech queue is closed, dropping utterance");
        }
    }

    /// 关闭队列并等待已排队的句子播放完
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!("Speech worker ended abnormally: {}", e);
        }
    }
}

async fn run_queue<S: SpeechSynthesizer>(
    synthesizer: S,
    locale: String,
    mut rx: mpsc::UnboundedReceiver<SpeechRequest>,
) {
    while let Some(request) = rx.recv().await {
        let voices = match synthesizer.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to query voices: {}", e);
                Vec::new()
            }
        };

        let voice_locale = synthesizer.voice_locale(&locale);
        let utterance = plan_utterance(
            &voices,
            &request.text,
            request.gender,
            &locale,
            &voice_locale,
        );
        debug!(
            "Speaking {:?} with voice {:?}",
            utterance.text,
            utterance.voice.as_ref().map(|v| v.name.as_str())
        );

        if let Err(e) = synthesizer.speak(&utterance).await {
            warn!("Speech failed: {}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSynthesizer;
    use super::*;

    fn huihui() -> Voice {
        Voice::new("Microsoft Huihui - Chinese (Simplified, PRC) - female", "zh-CN")
    }

    fn kangkang() -> Voice {
        Voice::new("Microsoft Kangkang - Chinese (Simplified, PRC) - male", "zh-CN")
    }

    #[test]
    fn selects_female_voice_by_name() {
        let voices = vec![huihui()];
        assert_eq!(
            select_voice(&voices, "zh-CN", VoiceGender::Female),
            Some(&huihui())
        );
    }

    #[test]
    fn selection_requires_matching_locale() {
        let voices = vec![Voice::new("Samantha - female", "en-US")];
        assert_eq!(select_voice(&voices, "zh-CN", VoiceGender::Female), None);
    }

    #[test]
    fn selection_takes_first_match() {
        let voices = vec![kangkang(), Voice::new("Another male", "zh-CN")];
        assert_eq!(
            select_voice(&voices, "zh-CN", VoiceGender::Male),
            Some(&kangkang())
        );
    }

    #[test]
    fn locale_comparison_ignores_case_and_separator() {
        assert!(locale_matches("zh_CN", "zh-CN"));
        assert!(locale_matches("ZH-cn", "zh-CN"));
        assert!(!locale_matches("zh-TW", "zh-CN"));
    }

    #[test]
    fn empty_voice_set_still_sets_language() {
        let utterance = plan_utterance(&[], "你好", VoiceGender::Male, "zh-CN", "zh-CN");
        assert_eq!(utterance.text, "你好");
        assert_eq!(utterance.lang, "zh-CN");
        assert!(utterance.voice.is_none());
    }

    #[test]
    fn unmatched_voice_falls_back_to_default() {
        let voices = vec![Voice::new("Tingting", "zh-CN")];
        let utterance = plan_utterance(&voices, "你好", VoiceGender::Female, "zh-CN", "zh-CN");
        assert!(utterance.voice.is_none());
        assert_eq!(utterance.lang, "zh-CN");
    }

    #[test]
    fn speaker_mapping_defaults() {
        let speakers = SpeakerVoices::default();
        assert_eq!(speakers.gender_for("A"), VoiceGender::Male);
        assert_eq!(speakers.gender_for("B"), VoiceGender::Female);
        assert_eq!(speakers.gender_for("a"), VoiceGender::Female);
    }

    #[test]
    fn parses_gender_names() {
        assert_eq!("Male".parse::<VoiceGender>(), Ok(VoiceGender::Male));
        assert_eq!("f".parse::<VoiceGender>(), Ok(VoiceGender::Female));
        assert!("robot".parse::<VoiceGender>().is_err());
    }

    #[tokio::test]
    async fn player_speaks_in_request_order() {
        let synth = RecordingSynthesizer::with_voices(vec![huihui(), kangkang()]);
        let player = SpeechPlayer::spawn(synth.clone(), "zh-CN");

        player.speak("第一句", VoiceGender::Female);
        player.speak("第二句", VoiceGender::Female);
        player.speak("第三句", VoiceGender::Female);
        player.shutdown().await;

        let spoken = synth.spoken();
        let texts: Vec<&str> = spoken.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["第一句", "第二句", "第三句"]);
        assert!(spoken.iter().all(|u| u.voice == Some(huihui())));
    }

    #[tokio::test]
    async fn player_speaks_without_voices() {
        let synth = RecordingSynthesizer::default();
        let player = SpeechPlayer::spawn(synth.clone(), "zh-CN");

        player.speak("你好", VoiceGender::Male);
        player.shutdown().await;

        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].lang, "zh-CN");
        assert!(spoken[0].voice.is_none());
    }
}
