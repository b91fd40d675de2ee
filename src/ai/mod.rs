pub mod claude;
pub mod openai;
pub mod openrouter;

pub use claude::ClaudeClient;
pub use openai::OpenAIClient;
pub use openrouter::OpenRouterClient;

use thiserror::Error;

use crate::config::Settings;
use crate::provider::Provider;
use crate::sanitize::sanitize;

pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f64 = 0.3;

/// Anything shorter than this after sanitization cannot be a diagram.
const MIN_DIAGRAM_LEN: usize = 5;

/// Instruction block sent with every generation request. The models still
/// ignore the formatting rules often enough that [`sanitize`] exists.
pub const SYSTEM_PROMPT: &str = r#"You are an expert at creating Mermaid.js diagrams. Generate a Mermaid diagram based on the user's text description.

CRITICAL RULES:
1. Return ONLY the Mermaid code without any explanations, markdown formatting, or code blocks
2. Do NOT include ```mermaid or ``` in your response
3. Do NOT include --- dashes or any other decorative elements
4. Start directly with the diagram type (e.g., "graph TD", "sequenceDiagram", "classDiagram", etc.)
5. End with the last diagram element - no extra formatting
6. Choose the most appropriate diagram type for the scenario
7. Use clear, descriptive node labels
8. Make the diagram comprehensive but not overly complex

EXAMPLE CORRECT FORMAT:
graph TD
A[Start] --> B{Decision?}
B --> C[Option 1]
B --> D[Option 2]

Common diagram types:
- graph TD/LR: For flowcharts and process flows
- sequenceDiagram: For interactions between entities over time
- classDiagram: For object-oriented relationships
- erDiagram: For database relationships
- gitgraph: For git workflows
- journey: For user journeys
- gantt: For project timelines

Remember: Return ONLY valid Mermaid syntax, nothing else!"#;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// Settings absent or incomplete; no request was attempted.
    #[error("Please configure your model and API key in Settings first")]
    NotConfigured,

    /// The provider could not be reached, or the reply was unreadable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx reply; the body is kept verbatim.
    #[error("API Error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider replied but produced no content at all.
    #[error("No diagram code received from the API")]
    EmptyResponse,

    /// Content arrived but sanitized down to nothing usable.
    #[error("Received empty or invalid diagram code from the API")]
    InvalidDiagram,
}

/// Upstream URLs, injectable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub openai: String,
    pub anthropic: String,
    pub openrouter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: openai::OPENAI_API_URL.to_string(),
            anthropic: claude::ANTHROPIC_API_URL.to_string(),
            openrouter: openrouter::OPENROUTER_API_URL.to_string(),
        }
    }
}

/// Turns free-form user text into sanitized Mermaid source through whichever
/// provider the settings route to.
#[derive(Debug, Clone, Default)]
pub struct GenerationService {
    endpoints: Endpoints,
}

impl GenerationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    /// One generation request. Fails fast (no network) when settings are
    /// absent or incomplete; otherwise routes per the decision table in
    /// [`Provider::select`], then normalizes and sanitizes the reply.
    pub async fn generate(
        &self,
        settings: Option<&Settings>,
        user_text: &str,
    ) -> Result<String, GenerateError> {
        let settings = settings
            .filter(|s| s.is_complete())
            .ok_or(GenerateError::NotConfigured)?;

        let provider = Provider::select(&settings.api_key, &settings.model_name);
        tracing::debug!(
            provider = provider.as_str(),
            model = %settings.model_name,
            "dispatching generation request"
        );

        let raw = match provider {
            Provider::OpenAI => {
                OpenAIClient::with_api_url(&settings.api_key, &self.endpoints.openai)
                    .query(&settings.model_name, user_text)
                    .await?
            }
            Provider::Claude => {
                ClaudeClient::with_api_url(&settings.api_key, &self.endpoints.anthropic)
                    .query(&settings.model_name, user_text)
                    .await?
            }
            Provider::OpenRouter => {
                OpenRouterClient::with_api_url(&settings.api_key, &self.endpoints.openrouter)
                    .query(&settings.model_name, user_text)
                    .await?
            }
        };

        if raw.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }

        let cleaned = sanitize(&raw);
        if cleaned.chars().count() < MIN_DIAGRAM_LEN {
            tracing::debug!(raw_len = raw.len(), "reply sanitized down to nothing usable");
            return Err(GenerateError::InvalidDiagram);
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_settings_fail_before_any_network() {
        let service = GenerationService::with_endpoints(Endpoints {
            // Unroutable on purpose: reaching the network would hang or error
            // differently than NotConfigured.
            openai: "http://127.0.0.1:1".to_string(),
            anthropic: "http://127.0.0.1:1".to_string(),
            openrouter: "http://127.0.0.1:1".to_string(),
        });

        let err = service.generate(None, "a user flow").await.unwrap_err();
        assert!(matches!(err, GenerateError::NotConfigured));
    }

    #[tokio::test]
    async fn incomplete_settings_fail_before_any_network() {
        let service = GenerationService::new();

        let settings = Settings::new("gpt-4o", "");
        let err = service
            .generate(Some(&settings), "a user flow")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NotConfigured));

        let settings = Settings::new("", "sk-abc");
        let err = service
            .generate(Some(&settings), "a user flow")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NotConfigured));
    }

    #[test]
    fn upstream_error_message_carries_status_and_body() {
        let err = GenerateError::Api {
            status: 401,
            body: "invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "API Error (401): invalid key");
    }

    #[test]
    fn error_messages_are_distinct_per_category() {
        let messages = [
            GenerateError::NotConfigured.to_string(),
            GenerateError::Api { status: 500, body: "x".into() }.to_string(),
            GenerateError::EmptyResponse.to_string(),
            GenerateError::InvalidDiagram.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn system_prompt_forbids_fences_and_separators() {
        assert!(SYSTEM_PROMPT.contains("```mermaid"));
        assert!(SYSTEM_PROMPT.contains("--- dashes"));
        assert!(SYSTEM_PROMPT.contains("ONLY valid Mermaid syntax"));
    }
}
