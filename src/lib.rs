//! # Merdi
//!
//! Turn plain-text scenarios into Mermaid diagrams with AI, from the
//! terminal.
//!
//! The interesting parts live in three layers:
//! - [`ai`]: provider routing and response normalization — one client per
//!   upstream wire contract, selected by [`provider::Provider::select`]
//! - [`sanitize`]: deterministic cleanup of model output into raw Mermaid
//! - [`diagram`]: the render pipeline — a token-guarded state machine over
//!   an external [`diagram::DiagramEngine`], plus SVG export
//!
//! Everything else ([`app`], [`ui`], [`handler`], [`tui`]) is the terminal
//! front end wiring those layers together.

pub mod ai;
pub mod app;
pub mod config;
pub mod diagram;
pub mod handler;
pub mod provider;
pub mod sanitize;
pub mod tui;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{Endpoints, GenerateError, GenerationService};
    pub use crate::config::Settings;
    pub use crate::diagram::{DiagramEngine, RenderPipeline, RenderState, Theme};
    pub use crate::provider::Provider;
}
