use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{normalize_scripts, ScriptBatchPayload, ScriptGenerator};
use crate::models::Script;
use crate::provider::heygen::error_message;
use crate::ReelError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You write short, high-impact video narration scripts for talking-avatar videos. \
Each script is 30 to 60 seconds when spoken and is structured with the section markers \
[HOOK], [BODY], [CLOSING STATEMENT] and [CTA]. \
Respond only with JSON of the form {\"scripts\": [{\"id\": 1, \"content\": \"...\"}]}.";

/// Script generator backed by an OpenAI-compatible chat completions API
pub struct OpenAiScriptGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiScriptGenerator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        }
    }

    fn user_prompt(topic: &str, num_variations: u8) -> String {
        format!(
            "Write {} distinct script variations about: {}. Number them from 1.",
            num_variations, topic
        )
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiScriptGenerator {
    async fn generate(&self, topic: &str, num_variations: u8) -> Result<Vec<Script>, ReelError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ReelError::configuration(
                "OpenAI API key not configured. Set OPENAI_API_KEY or scripts.api_key in the config file.",
            )
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(topic, num_variations),
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.9,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw_body = response.text().await.unwrap_or_default();
            let message = error_message(&raw_body)
                .unwrap_or_else(|| format!("Failed to generate scripts: HTTP {}", status.as_u16()));
            return Err(ReelError::Provider {
                status_code: Some(status.as_u16()),
                message,
                raw_body: Some(raw_body),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReelError::transport(format!("Invalid completion response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReelError::transport("Completion response contained no message"))?;

        let payload: ScriptBatchPayload = serde_json::from_str(&content)
            .map_err(|e| ReelError::transport(format!("Model returned malformed scripts: {}", e)))?;

        Ok(normalize_scripts(payload, num_variations))
    }

    fn generator_name(&self) -> &'static str {
        "OpenAI"
    }
}
