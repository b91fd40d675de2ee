use reqwest::Client;

use super::openai::{ChatRequest, ChatResponse};
use super::GenerateError;

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter asks callers to identify themselves; these two headers are how
/// the app shows up in their dashboard.
const REFERER: &str = "https://localhost:3000";
const APP_TITLE: &str = "Merdi";

/// Aggregator client. Speaks the OpenAI chat-completions protocol — the
/// request/response structs live in [`super::openai`] — plus the attribution
/// headers above.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_api_url(api_key, OPENROUTER_API_URL)
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
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
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
