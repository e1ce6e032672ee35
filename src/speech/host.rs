//! 调用本机命令行工具的语音合成后端（macOS `say`、`espeak-ng`/`espeak`）

use crate::error::{AppError, Result};
use crate::speech::{SpeechSynthesizer, Utterance, Voice, VoiceGender};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSynthesizer {
    Say,
    ESpeak { binary: String },
    /// 没有可用的合成工具，只记录日志
    Unavailable,
}

impl HostSynthesizer {
    /// 按 say、espeak-ng、espeak 的顺序检测
    pub fn detect() -> Self {
        let detected = if which::which("say").is_ok() {
            HostSynthesizer::Say
        } else if which::which("espeak-ng").is_ok() {
            HostSynthesizer::ESpeak {
                binary: "espeak-ng".into(),
            }
        } else if which::which("espeak").is_ok() {
            HostSynthesizer::ESpeak {
                binary: "espeak".into(),
            }
        } else {
            warn!("No speech synthesizer found on PATH; playback is disabled");
            HostSynthesizer::Unavailable
        };
        info!("Using speech backend: {}", detected.name());
        detected
    }

    pub fn name(&self) -> &str {
        match self {
            HostSynthesizer::Say => "say",
            HostSynthesizer::ESpeak { binary } => binary,
            HostSynthesizer::Unavailable => "none",
        }
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        let (program, arg) = match self {
            HostSynthesizer::Say => ("say", "-v"),
            HostSynthesizer::ESpeak { binary } => (binary.as_str(), "--voices"),
            HostSynthesizer::Unavailable => return Ok(Vec::new()),
        };

        let mut cmd = Command::new(program);
        cmd.arg(arg);
        if matches!(self, HostSynthesizer::Say) {
            cmd.arg("?");
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| AppError::Speech(format!("Failed to run {}: {}", program, e)))?;
        if !output.status.success() {
            return Err(AppError::Speech(format!(
                "{} voice listing failed: {}",
                program,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(match self {
            HostSynthesizer::Say => parse_say_voices(&stdout),
            _ => parse_espeak_voices(&stdout),
        })
    }

    fn command_for(&self, utterance: &Utterance) -> Option<Command> {
        match self {
            HostSynthesizer::Say => {
                let mut cmd = Command::new("say");
                // say 不支持语言参数，没有指定语音时使用系统默认
                if let Some(voice) = &utterance.voice {
                    cmd.arg("-v").arg(&voice.name);
                }
                Some(cmd)
            }
            HostSynthesizer::ESpeak { binary } => {
                let mut cmd = Command::new(binary);
                let language = match &utterance.voice {
                    Some(voice) => voice.lang.clone(),
                    None => espeak_language(&utterance.lang),
                };
                // 以 +m3/+f3 变体区分男女声
                let variant = match utterance.gender {
                    VoiceGender::Male => "+m3",
                    VoiceGender::Female => "+f3",
                };
                cmd.arg("-v").arg(format!("{}{}", language, variant));
                Some(cmd)
            }
            HostSynthesizer::Unavailable => None,
        }
    }
}

impl SpeechSynthesizer for HostSynthesizer {
    async fn voices(&self) -> Result<Vec<Voice>> {
        self.list_voices().await
    }

    fn voice_locale(&self, locale: &str) -> String {
        match self {
            HostSynthesizer::ESpeak { .. } => espeak_language(locale),
            _ => locale.to_string(),
        }
    }

    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        let Some(mut cmd) = self.command_for(utterance) else {
            info!("(no speech backend) {}", utterance.text);
            return Ok(());
        };

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| AppError::Speech(format!("Failed to start {}: {}", self.name(), e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Speech(format!("{} stdin unavailable", self.name())))?;
        stdin.write_all(utterance.text.as_bytes()).await?;
        // 关闭 stdin 才会开始朗读
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AppError::Speech(format!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

/// espeak 以语言代码选择语音，普通话为 cmn
fn espeak_language(locale: &str) -> String {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_ascii_lowercase();
    match primary.as_str() {
        "zh" => "cmn".to_string(),
        _ => primary,
    }
}

/// 解析 `say -v '?'` 的输出：
///
/// ```text
/// Tingting            zh_CN    # 你好，我叫婷婷。
/// Eddy (Chinese (China mainland)) zh_CN    # 你好！我叫Eddy。
/// ```
fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim_end();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || lang.is_empty() {
                debug!("Skipping unparseable say voice line: {}", line);
                return None;
            }
            Some(Voice::new(name, lang.replace('_', "-")))
        })
        .collect()
}

/// 解析 `espeak-ng --voices` 的输出：
///
/// ```text
/// Pty Language Age/Gender VoiceName File Other Languages
///  5  cmn          --/M      Chinese_(Mandarin) sit/cmn
/// ```
///
/// Age/Gender 列中的性别会拼进名称（"Chinese (Mandarin) - male"），以便按名称匹配性别。
fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 || parts[0].parse::<u32>().is_err() {
                return None;
            }
            let lang = parts[1];
            let name = parts[3].replace('_', " ");
            let name = match parts[2].rsplit('/').next() {
                Some("M") => format!("{} - male", name),
                Some("F") => format!("{} - female", name),
                _ => name,
            };
            Some(Voice::new(name, lang))
        })
        .collect()
}
