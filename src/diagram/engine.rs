//! The render engine boundary.
//!
//! Layout is not this crate's business: an engine takes Mermaid source and a
//! configuration and hands back SVG markup. Everything engine-specific sits
//! behind [`DiagramEngine`] so the pipeline and the UI never know which
//! engine is wired in.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use super::Theme;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine rejected the diagram source. Terminal for this input; the
    /// user has to change the text.
    #[error("Diagram syntax error: {0}")]
    Syntax(String),

    /// The engine itself misbehaved (non-syntax failure).
    #[error("Render engine error: {0}")]
    Engine(String),

    /// The engine could not be reached.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Sequence-diagram spacing, in engine pixels.
#[derive(Debug, Clone, Copy)]
pub struct SequenceSizing {
    pub actor_margin: u32,
    pub width: u32,
    pub height: u32,
    pub box_margin: u32,
    pub box_text_margin: u32,
    pub note_margin: u32,
    pub message_margin: u32,
}

impl Default for SequenceSizing {
    fn default() -> Self {
        Self {
            actor_margin: 50,
            width: 150,
            height: 65,
            box_margin: 10,
            box_text_margin: 5,
            note_margin: 10,
            message_margin: 35,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GanttSizing {
    pub font_size: u32,
    pub number_section_styles: u32,
}

impl Default for GanttSizing {
    fn default() -> Self {
        Self {
            font_size: 11,
            number_section_styles: 4,
        }
    }
}

/// Engine configuration for one render attempt: the theme plus the
/// per-diagram-type sizing the engine bakes into its output.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub theme: Theme,
    pub font_family: String,
    pub flowchart_curve: String,
    pub sequence: SequenceSizing,
    pub gantt: GanttSizing,
}

impl EngineOptions {
    pub fn for_theme(theme: Theme) -> Self {
        Self {
            theme,
            font_family: "Inter, system-ui, sans-serif".to_string(),
            flowchart_curve: "basis".to_string(),
            sequence: SequenceSizing::default(),
            gantt: GanttSizing::default(),
        }
    }

    /// Mermaid init directive equivalent of this configuration. Prepending
    /// it to the source is how the theme reaches any Mermaid-speaking
    /// engine — themes are baked into the generated markup, not applied as
    /// a display filter afterwards.
    pub fn init_directive(&self) -> String {
        let init = json!({
            "theme": self.theme.as_str(),
            "fontFamily": self.font_family,
            "flowchart": { "useMaxWidth": true, "htmlLabels": true, "curve": self.flowchart_curve },
            "sequence": {
                "useMaxWidth": true,
                "actorMargin": self.sequence.actor_margin,
                "width": self.sequence.width,
                "height": self.sequence.height,
                "boxMargin": self.sequence.box_margin,
                "boxTextMargin": self.sequence.box_text_margin,
                "noteMargin": self.sequence.note_margin,
                "messageMargin": self.sequence.message_margin,
            },
            "class": { "useMaxWidth": true },
            "er": { "useMaxWidth": true },
            "journey": { "useMaxWidth": true },
            "gantt": {
                "useMaxWidth": true,
                "fontSize": self.gantt.font_size,
                "numberSectionStyles": self.gantt.number_section_styles,
            },
        });
        format!("%%{{init: {}}}%%", init)
    }

    /// Source as submitted to the engine: directive first, diagram after.
    pub fn apply_to(&self, source: &str) -> String {
        format!("{}\n{}", self.init_directive(), source)
    }
}

/// An external diagram renderer. `validate` checks syntax; `render` yields
/// SVG markup keyed by the caller-supplied unique id.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn validate(&self, source: &str, options: &EngineOptions) -> Result<(), RenderError>;

    async fn render(
        &self,
        id: &str,
        source: &str,
        options: &EngineOptions,
    ) -> Result<String, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_carries_theme() {
        let options = EngineOptions::for_theme(Theme::Dark);
        let directive = options.init_directive();
        assert!(directive.starts_with("%%{init:"));
        assert!(directive.ends_with("}%%"));
        assert!(directive.contains(r#""theme":"dark""#));
    }

    #[test]
    fn directive_carries_per_diagram_sizing() {
        let directive = EngineOptions::for_theme(Theme::Default).init_directive();
        assert!(directive.contains(r#""actorMargin":50"#));
        assert!(directive.contains(r#""messageMargin":35"#));
        assert!(directive.contains(r#""fontSize":11"#));
        assert!(directive.contains(r#""curve":"basis""#));
    }

    #[test]
    fn apply_prepends_directive_to_source() {
        let options = EngineOptions::for_theme(Theme::Forest);
        let prepared = options.apply_to("graph TD\nA-->B");
        let mut lines = prepared.lines();
        assert!(lines.next().unwrap().starts_with("%%{init:"));
        assert_eq!(lines.next(), Some("graph TD"));
        assert_eq!(lines.next(), Some("A-->B"));
    }
}
