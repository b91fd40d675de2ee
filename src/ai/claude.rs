use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerateError, MAX_TOKENS, SYSTEM_PROMPT};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

impl ClaudeResponse {
    /// `content[0].text`, or empty when the shape is missing a piece.
    fn extract_content(self) -> String {
        self.content
            .into_iter()
            .next()
            .and_then(|content| content.text)
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_api_url(api_key, ANTHROPIC_API_URL)
    }

    pub fn with_api_url(api_key: &str, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_url: api_url.to_string(),
        }
    }

    /// The messages API has no system role here; the instruction block is
    /// folded into the single user turn, matching the upstream contract.
    pub async fn query(&self, model: &str, user_text: &str) -> Result<String, GenerateError> {
        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: MAX_TOKENS,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: format!("{}\n\nUser request: {}", SYSTEM_PROMPT, user_text),
            }],
        };

        let response = self.client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api { status, body });
        }

        let parsed: ClaudeResponse = response.json().await?;
        Ok(parsed.extract_content())
    }
}
