use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load scenes from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// 场景 JSON 的结构错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("scene is not a JSON object")]
    NotAnObject,

    #[error("field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{0}` must be a string")]
    NotAString(&'static str),

    #[error("field `{0}` must be an array")]
    NotASequence(&'static str),

    #[error("dialog[{index}].{field} must be a non-empty string")]
    EmptyLineField { index: usize, field: &'static str },

    #[error("translation[{0}] must be a string")]
    TranslationNotAString(usize),

    #[error("translation has {translation} entries but dialog has {dialog}")]
    TranslationMismatch { dialog: usize, translation: usize },
}

/// 一次场景生成请求的失败原因
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("scene description is empty")]
    EmptyInput,

    #[error("a scene is already being generated")]
    Busy,

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion content is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("completion content is not a valid scene: {0}")]
    Format(#[from] FormatError),
}

impl GenerateError {
    /// 给用户看的简短提示，详细信息只写日志
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerateError::EmptyInput => "Please enter a description for the new scene!",
            GenerateError::Busy => "A scene is already being generated, please wait.",
            GenerateError::Transport(_) => {
                "Failed to generate the scene. Please check your network or API configuration."
            }
            GenerateError::Parse(_) => "Failed to generate the scene. Invalid data format returned!",
            GenerateError::Format(_) => "The generated scene format is incorrect!",
        }
    }
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_details() {
        let err = GenerateError::Transport("secret endpoint 500".into());
        assert!(!err.user_message().contains("secret"));

        let err = GenerateError::Format(FormatError::MissingField("dialog"));
        assert_eq!(err.user_message(), "The generated scene format is incorrect!");
        assert!(err.to_string().contains("dialog"));
    }

    #[test]
    fn parse_errors_convert_from_serde() {
        let err: GenerateError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, GenerateError::Parse(_)));
    }
}
