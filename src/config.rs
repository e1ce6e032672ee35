use crate::error::{AppError, Result};
use crate::speech::{SpeakerVoices, VoiceGender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// 补全接口的认证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `api-key: <key>` 请求头（Azure OpenAI）
    ApiKey,
    /// `Authorization: Bearer <key>`
    Bearer,
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api-key" | "apikey" => Ok(AuthScheme::ApiKey),
            "bearer" => Ok(AuthScheme::Bearer),
            other => Err(format!("unknown auth scheme `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub auth: AuthScheme,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scenes_path: PathBuf,
    pub completion: CompletionConfig,
    /// 语音合成使用的语言标签
    pub locale: String,
    pub speakers: SpeakerVoices,
    /// 生成的场景是否写回场景列表
    pub persist_generated: bool,
    pub require_aligned_translation: bool,
}

impl AppConfig {
    /// 从环境变量读取配置，未设置时使用默认值
    ///
    /// | 环境变量                      | 默认值             |
    /// |-------------------------------|--------------------|
    /// | `SCENES_PATH`                 | `data/scenes.json` |
    /// | `COMPLETION_ENDPOINT`         | 未设置             |
    /// | `COMPLETION_API_KEY`          | 未设置             |
    /// | `COMPLETION_AUTH`             | `api-key`          |
    /// | `COMPLETION_MODEL`            | 未设置             |
    /// | `COMPLETION_MAX_TOKENS`       | `1000`             |
    /// | `COMPLETION_TEMPERATURE`      | `0.7`              |
    /// | `REQUEST_TIMEOUT_SECS`        | `300`              |
    /// | `SPEECH_LOCALE`               | `zh-CN`            |
    /// | `SPEAKER_GENDERS`             | `A=male`           |
    /// | `DEFAULT_SPEAKER_GENDER`      | `female`           |
    /// | `PERSIST_GENERATED`           | `false`            |
    /// | `REQUIRE_ALIGNED_TRANSLATION` | `true`             |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let completion = CompletionConfig {
            endpoint: non_empty("COMPLETION_ENDPOINT"),
            api_key: non_empty("COMPLETION_API_KEY"),
            auth: parse_or(&lookup, "COMPLETION_AUTH", AuthScheme::ApiKey)?,
            model: non_empty("COMPLETION_MODEL"),
            max_tokens: parse_or(&lookup, "COMPLETION_MAX_TOKENS", 1000)?,
            temperature: parse_or(&lookup, "COMPLETION_TEMPERATURE", 0.7)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 300)?,
        };

        let speakers = SpeakerVoices::new(
            parse_speaker_genders(
                &lookup("SPEAKER_GENDERS").unwrap_or_else(|| "A=male".into()),
            )?,
            parse_or(&lookup, "DEFAULT_SPEAKER_GENDER", VoiceGender::Female)?,
        );

        Ok(Self {
            scenes_path: lookup("SCENES_PATH")
                .unwrap_or_else(|| "data/scenes.json".into())
                .into(),
            completion,
            locale: lookup("SPEECH_LOCALE").unwrap_or_else(|| "zh-CN".into()),
            speakers,
            persist_generated: parse_or(&lookup, "PERSIST_GENERATED", false)?,
            require_aligned_translation: parse_or(&lookup, "REQUIRE_ALIGNED_TRANSLATION", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} has invalid value `{}`: {}", key, raw, e))),
        _ => Ok(default),
    }
}

/// 解析 `A=male,B=female` 形式的说话人映射
pub fn parse_speaker_genders(raw: &str) -> Result<HashMap<String, VoiceGender>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (label, gender) = pair.split_once('=').ok_or_else(|| {
                AppError::Config(format!("speaker mapping `{}` must look like LABEL=GENDER", pair))
            })?;
            let gender = gender
                .trim()
                .parse::<VoiceGender>()
                .map_err(|e| AppError::Config(format!("speaker mapping `{}`: {}", pair, e)))?;
            Ok((label.trim().to_string(), gender))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.scenes_path, PathBuf::from("data/scenes.json"));
        assert_eq!(config.locale, "zh-CN");
        assert!(!config.persist_generated);
        assert!(config.require_aligned_translation);
        assert_eq!(config.completion.max_tokens, 1000);
        assert!((config.completion.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.completion.auth, AuthScheme::ApiKey);
        assert!(config.completion.endpoint.is_none());
        assert_eq!(config.speakers.gender_for("A"), VoiceGender::Male);
        assert_eq!(config.speakers.gender_for("B"), VoiceGender::Female);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SCENES_PATH", "/tmp/s.json"),
            ("COMPLETION_ENDPOINT", "http://localhost:9999/chat"),
            ("COMPLETION_API_KEY", "k"),
            ("COMPLETION_AUTH", "bearer"),
            ("COMPLETION_MAX_TOKENS", "512"),
            ("SPEECH_LOCALE", "ja-JP"),
            ("SPEAKER_GENDERS", "A=female, B=male"),
            ("DEFAULT_SPEAKER_GENDER", "male"),
            ("PERSIST_GENERATED", "true"),
            ("REQUIRE_ALIGNED_TRANSLATION", "false"),
        ]))
        .unwrap();

        assert_eq!(config.scenes_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.completion.endpoint.as_deref(), Some("http://localhost:9999/chat"));
        assert_eq!(config.completion.auth, AuthScheme::Bearer);
        assert_eq!(config.completion.max_tokens, 512);
        assert_eq!(config.locale, "ja-JP");
        assert_eq!(config.speakers.gender_for("A"), VoiceGender::Female);
        assert_eq!(config.speakers.gender_for("B"), VoiceGender::Male);
        assert_eq!(config.speakers.gender_for("C"), VoiceGender::Male);
        assert!(config.persist_generated);
        assert!(!config.require_aligned_translation);
    }

    #[test]
    fn blank_api_key_is_treated_as_unset() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("COMPLETION_API_KEY", "  ")])).unwrap();
        assert!(config.completion.api_key.is_none());
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = AppConfig::from_lookup(lookup_from(&[("COMPLETION_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("COMPLETION_MAX_TOKENS")));
    }

    #[test]
    fn rejects_malformed_speaker_mapping() {
        assert!(parse_speaker_genders("A").is_err());
        assert!(parse_speaker_genders("A=robot").is_err());
        assert!(parse_speaker_genders("").unwrap().is_empty());
    }
}
