use crate::config::{AuthScheme, CompletionConfig};
use crate::error::{AppError, GenerateError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Chat-completion 接口客户端
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    auth: AuthScheme,
    model: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| AppError::Config("COMPLETION_ENDPOINT is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("COMPLETION_API_KEY is not set".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            auth: config.auth,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// 发送一次补全请求，返回第一条回复的文本；不重试
    pub async fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, GenerateError> {
        info!("Requesting completion from {}", self.endpoint);

        let mut request_body = json!({
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if let Some(model) = &self.model {
            request_body["model"] = json!(model);
        }

        let request = self.client.post(&self.endpoint).json(&request_body);
        let request = match self.auth {
            AuthScheme::ApiKey => request.header("api-key", &self.api_key),
            AuthScheme::Bearer => request.bearer_auth(&self.api_key),
        };

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Completion API error (HTTP {}): {}", status, error_text);
            return Err(GenerateError::Transport(format!("HTTP {}", status)));
        }

        let body: CompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerateError::Transport("completion returned no choices".into()))?;

        debug!("Completion content: {}", content);
        Ok(content)
    }
}
