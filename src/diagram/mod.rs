//! The render pipeline: a state machine over diagram source and theme.
//!
//! Rendering is asynchronous and uncancellable, so every attempt carries a
//! monotonically increasing token; a completion only lands if its token is
//! still the latest. That is the whole concurrency story — a newer request
//! supersedes interest in an older one's result.

pub mod engine;
pub mod export;
pub mod kroki;

pub use engine::{DiagramEngine, EngineOptions, RenderError};
pub use export::{export_svg, ExportError};
pub use kroki::KrokiEngine;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
}

impl Theme {
    /// Name as the engine spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
            Theme::Forest => "forest",
            Theme::Neutral => "neutral",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::Dark => "Dark",
            Theme::Forest => "Forest",
            Theme::Neutral => "Neutral",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Theme::Default => Theme::Dark,
            Theme::Dark => Theme::Forest,
            Theme::Forest => Theme::Neutral,
            Theme::Neutral => Theme::Default,
        }
    }
}

/// Exactly one of these holds at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Empty,
    Loading,
    Rendered(String),
    Errored(String),
}

/// Everything a spawned task needs to run one validate+render cycle.
#[derive(Debug, Clone)]
pub struct RenderAttempt {
    pub token: u64,
    pub id: String,
    pub source: String,
    pub theme: Theme,
}

/// Fresh engine id for one render attempt. The engine keys internal state by
/// this id, so collisions across attempts would corrupt its registry.
pub fn new_diagram_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("mermaid-{}-{:08x}", millis, rand::random::<u32>())
}

pub struct RenderPipeline {
    state: RenderState,
    theme: Theme,
    raw_source: Option<String>,
    latest_token: u64,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            state: RenderState::Empty,
            theme: Theme::Default,
            raw_source: None,
            latest_token: 0,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// The original source exactly as it arrived, kept for the error
    /// disclosure. Never discarded while it is the current input.
    pub fn raw_source(&self) -> Option<&str> {
        self.raw_source.as_deref()
    }

    pub fn rendered_svg(&self) -> Option<&str> {
        match &self.state {
            RenderState::Rendered(svg) => Some(svg),
            _ => None,
        }
    }

    /// New input. Empty (or sanitizes-to-empty) input clears the pane;
    /// anything else starts a render attempt.
    pub fn set_source(&mut self, source: Option<String>) -> Option<RenderAttempt> {
        self.raw_source = source.filter(|s| !s.trim().is_empty());
        self.begin_attempt()
    }

    /// Theme switch. A no-op on an empty pane; otherwise the current source
    /// goes through a full re-render with the new theme.
    pub fn set_theme(&mut self, theme: Theme) -> Option<RenderAttempt> {
        self.theme = theme;
        if self.raw_source.is_none() {
            return None;
        }
        self.begin_attempt()
    }

    fn begin_attempt(&mut self) -> Option<RenderAttempt> {
        // Every transition bumps the token, including into Empty, so an
        // in-flight attempt for the previous input can never land.
        self.latest_token += 1;

        // The generation service already sanitized, but this pipeline does
        // not trust its callers: whatever arrives is sanitized again.
        let cleaned = self.raw_source.as_deref().map(sanitize).unwrap_or_default();
        if cleaned.is_empty() {
            self.state = RenderState::Empty;
            return None;
        }

        self.state = RenderState::Loading;
        Some(RenderAttempt {
            token: self.latest_token,
            id: new_diagram_id(),
            source: cleaned,
            theme: self.theme,
        })
    }

    /// Land a finished attempt. Returns false (and changes nothing) when the
    /// attempt has been superseded.
    pub fn complete(&mut self, token: u64, outcome: Result<String, RenderError>) -> bool {
        if token != self.latest_token || self.state != RenderState::Loading {
            tracing::debug!(token, latest = self.latest_token, "discarding stale render result");
            return false;
        }

        self.state = match outcome {
            Ok(svg) => RenderState::Rendered(svg),
            Err(err) => RenderState::Errored(err.to_string()),
        };
        true
    }
}

/// One validate+render cycle against an engine.
pub async fn run_attempt(
    engine: &dyn DiagramEngine,
    attempt: &RenderAttempt,
) -> Result<String, RenderError> {
    let options = EngineOptions::for_theme(attempt.theme);
    engine.validate(&attempt.source, &options).await?;
    engine.render(&attempt.id, &attempt.source, &options).await
}
