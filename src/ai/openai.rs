use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerateError, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat-completions wire shape. OpenRouter speaks the same protocol, so the
/// request/response structs are shared with that client.
#[derive(Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatRequest {
    pub(crate) fn for_diagram(model: &str, user_text: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

impl ChatResponse {
    /// `choices[0].message.content`, or empty when the shape is missing a
    /// piece. Empty content is the service's problem, not a decode error.
    pub(crate) fn extract_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_api_url(api_key, OPENAI_API_URL)
    }

    pub fn with_api_url(api_key: &str, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
        }
    }

    pub async fn query(&self, model: &str, user_text: &str) -> Result<String, GenerateError> {
        let request = ChatRequest::for_diagram(model, user_text);

        let response = self.client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed.extract_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_and_user_messages() {
        let request = ChatRequest::for_diagram("gpt-4o", "a login flow");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["temperature"], 0.3);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "a login flow");
    }

    #[test]
    fn extracts_first_choice_content() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "  graph TD\nA-->B  "}}]
        }))
        .unwrap();
        assert_eq!(parsed.extract_content(), "graph TD\nA-->B");
    }

    #[test]
    fn missing_pieces_extract_as_empty() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(parsed.extract_content(), "");

        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": null}]
        }))
        .unwrap();
        assert_eq!(parsed.extract_content(), "");
    }
}
