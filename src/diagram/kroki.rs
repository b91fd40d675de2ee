use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};

use super::engine::{DiagramEngine, EngineOptions, RenderError};

pub const KROKI_URL: &str = "https://kroki.io";

/// Kroki's mermaid endpoint: POST the diagram text, get SVG back. A 400
/// carries the syntax error message in the body. The engine has no
/// parse-only endpoint, so `validate` runs a render and discards the markup.
#[derive(Clone)]
pub struct KrokiEngine {
    client: Client,
    base_url: String,
}

impl KrokiEngine {
    pub fn new() -> Self {
        Self::with_base_url(KROKI_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_diagram(
        &self,
        source: &str,
        options: &EngineOptions,
    ) -> Result<String, RenderError> {
        let response = self.client
            .post(format!("{}/mermaid/svg", self.base_url))
            .header("Content-Type", "text/plain")
            .body(options.apply_to(source))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            return Err(RenderError::Syntax(message.trim().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Engine(format!("{}: {}", status.as_u16(), body)));
        }

        Ok(response.text().await?)
    }
}

impl Default for KrokiEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiagramEngine for KrokiEngine {
    async fn validate(&self, source: &str, options: &EngineOptions) -> Result<(), RenderError> {
        self.post_diagram(source, options).await.map(|_| ())
    }

    async fn render(
        &self,
        id: &str,
        source: &str,
        options: &EngineOptions,
    ) -> Result<String, RenderError> {
        let svg = self.post_diagram(source, options).await?;
        Ok(embed_id(&svg, id))
    }
}

static ID_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bid="[^"]*""#).unwrap());

/// Key the returned markup by the attempt id, on the root `<svg>` tag only.
fn embed_id(svg: &str, id: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let Some(end) = svg[start..].find('>').map(|i| start + i) else {
        return svg.to_string();
    };

    let tag = &svg[start..end];
    let new_tag = if ID_ATTR.is_match(tag) {
        ID_ATTR
            .replace(tag, regex::NoExpand(&format!(r#"id="{id}""#)))
            .into_owned()
    } else {
        format!(r#"{} id="{id}""#, tag.trim_end_matches('/'))
    };

    format!("{}{}{}", &svg[..start], new_tag, &svg[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_id_when_root_has_none() {
        let svg = r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"><g/></svg>"#;
        let tagged = embed_id(svg, "mermaid-1-aa");
        assert!(tagged.contains(r#"<svg xmlns="http://www.w3.org/2000/svg" id="mermaid-1-aa">"#));
    }

    #[test]
    fn replaces_existing_root_id() {
        let svg = r#"<svg id="old" width="10"><text id="inner">x</text></svg>"#;
        let tagged = embed_id(svg, "fresh");
        assert!(tagged.contains(r#"<svg id="fresh" width="10">"#));
        // Only the root tag is touched.
        assert!(tagged.contains(r#"<text id="inner">"#));
    }

    #[test]
    fn non_svg_body_passes_through() {
        assert_eq!(embed_id("not markup", "x"), "not markup");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let engine = KrokiEngine::with_base_url("http://localhost:8000/");
        assert_eq!(engine.base_url, "http://localhost:8000");
    }
}
