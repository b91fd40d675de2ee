//! SVG export: turn the rendered pane markup into a standalone file.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const EXPORT_FILE_NAME: &str = "diagram.svg";

/// Display rules the pane applies to the markup, inlined on export so the
/// file reads the same opened outside the app.
const DISPLAY_CSS: &str = "svg{max-width:100%;height:auto;display:block;margin:auto;}";

const SVG_XMLNS: &str = r#"xmlns="http://www.w3.org/2000/svg""#;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing rendered to export")]
    NothingRendered,

    #[error("could not write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the markup as `diagram.svg` under `dest_dir` and return the path.
///
/// The markup is made standalone first (see [`prepare_standalone`]), staged
/// in a temp file, and persisted with a rename; the temp handle is released
/// as part of the persist, so repeated exports leak nothing.
pub fn export_svg(svg: &str, dest_dir: &Path) -> Result<PathBuf, ExportError> {
    let prepared = prepare_standalone(svg);
    let path = dest_dir.join(EXPORT_FILE_NAME);

    let tmp = tempfile::NamedTempFile::new_in(dest_dir)?;
    fs::write(tmp.path(), prepared.as_bytes())?;
    tmp.persist(&path).map_err(|err| ExportError::Io(err.error))?;

    tracing::info!(path = %path.display(), "exported diagram");
    Ok(path)
}

// Attributes only — a leading \s keeps `stroke-width` and friends safe.
static SIZE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s(?:width|height)="[^"]*""#).unwrap());
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\sstyle="([^"]*)""#).unwrap());

/// Make one SVG document standalone:
/// fixed `width`/`height` (and sizing declarations in the root `style`
/// attribute) are stripped so the image scales naturally, the SVG namespace
/// is guaranteed, and the display stylesheet is inlined. Only the root tag
/// is rewritten; nested elements keep their sizing.
pub fn prepare_standalone(svg: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let Some(end) = svg[start..].find('>').map(|i| start + i) else {
        return svg.to_string();
    };

    let mut tag = svg[start..end].to_string();

    tag = SIZE_ATTR.replace_all(&tag, "").into_owned();

    if let Some(captures) = STYLE_ATTR.captures(&tag) {
        let kept = scrub_sizing_declarations(&captures[1]);
        let replacement = if kept.is_empty() {
            String::new()
        } else {
            format!(r#" style="{kept}""#)
        };
        tag = STYLE_ATTR.replace(&tag, regex::NoExpand(&replacement)).into_owned();
    }

    if !tag.contains("xmlns=") {
        tag = format!("<svg {}{}", SVG_XMLNS, &tag["<svg".len()..]);
    }

    format!(
        "{}{}><style>{}</style>{}",
        &svg[..start],
        tag,
        DISPLAY_CSS,
        &svg[end + 1..]
    )
}

/// Drop width/height/max-width/max-height declarations, keep the rest.
fn scrub_sizing_declarations(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or("").trim();
            !matches!(property, "width" | "height" | "max-width" | "max-height")
        })
        .collect::<Vec<_>>()
        .join("; ")
}
