use crate::api::{ChatMessage, CompletionClient};
use crate::error::GenerateError;
use crate::scene::{validate_scene_format, Scene};
use tracing::{error, info};

const SYSTEM_PROMPT: &str = "You are an assistant that generates Chinese learning conversations.";

/// 根据一段描述调用大模型生成新场景
#[derive(Debug, Clone)]
pub struct SceneGenerator {
    client: CompletionClient,
    require_aligned: bool,
}

impl SceneGenerator {
    pub fn new(client: CompletionClient, require_aligned: bool) -> Self {
        Self {
            client,
            require_aligned,
        }
    }

    pub async fn generate(&self, description: &str) -> Result<Scene, GenerateError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(GenerateError::EmptyInput);
        }

        info!("Generating scene for: {}", description);
        let content = self.client.complete(&build_messages(description)).await?;
        let scene = parse_scene(&content, self.require_aligned)?;

        info!(
            "Generated scene \"{}\" with {} lines",
            scene.title,
            scene.dialog.len()
        );
        Ok(scene)
    }
}

pub fn build_messages(description: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Generate a Chinese conversation based on the following description and provide a title (no more than four English words). The JSON structure should follow:
{{
    "id": 1,
    "title": "Scene Title",
    "description": "Scene Description",
    "dialog": [
        {{ "speaker": "A", "text": "Dialog text 1", "pingyin": "Pinyin 1" }},
        {{ "speaker": "B", "text": "Dialog text 2", "pingyin": "Pinyin 2" }}
    ],
    "translation": [
        "A: English translation 1",
        "B: English translation 2"
    ]
}}
The dialog should have no more than 6 lines.
Description: {}"#,
        description.trim()
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// 解析模型返回的文本；原始内容只写日志，不返回给用户
pub fn parse_scene(content: &str, require_aligned: bool) -> Result<Scene, GenerateError> {
    // 清理可能的markdown标记
    let json_text = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: serde_json::Value = serde_json::from_str(json_text).map_err(|e| {
        error!("Error parsing scene JSON: {} (content: {})", e, content);
        GenerateError::Parse(e)
    })?;

    validate_scene_format(&value, require_aligned).map_err(|e| {
        error!("Invalid scene format received: {} (payload: {})", e, value);
        GenerateError::Format(e)
    })
}
