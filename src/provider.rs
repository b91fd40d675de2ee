/// Prefix OpenRouter stamps on every key it issues.
pub const OPENROUTER_KEY_PREFIX: &str = "sk-or-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Claude,
    OpenRouter,
}

impl Provider {
    /// Pick the upstream protocol for a settings pair.
    ///
    /// Order matters: an OpenRouter-issued key always routes to OpenRouter,
    /// even when the model name mentions "gpt" or "claude" — those names are
    /// valid OpenRouter model ids (e.g. `openai/gpt-4o`). Only when the key
    /// is not OpenRouter's do the model-name checks apply, case-insensitive.
    pub fn select(api_key: &str, model_name: &str) -> Self {
        if api_key.starts_with(OPENROUTER_KEY_PREFIX) {
            return Provider::OpenRouter;
        }

        let model = model_name.to_lowercase();
        if model.contains("gpt") {
            Provider::OpenAI
        } else if model.contains("claude") {
            Provider::Claude
        } else {
            Provider::OpenRouter
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenRouter => "OpenRouter",
        }
    }
}
