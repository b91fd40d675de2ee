//! Cleanup of model output into raw Mermaid source.
//!
//! Models are instructed to return bare diagram syntax, but routinely wrap it
//! in markdown fences or decorate it with `---` separator lines anyway. The
//! render engine rejects both, so everything downstream of the providers goes
//! through this one function.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:mermaid)?").unwrap());

/// Strip fence markers, leading/trailing separator lines, and surrounding
/// blank lines. Idempotent: running it twice gives the same result, so the
/// render pipeline can safely re-sanitize what the generation service hands
/// it. Interior separator lines are untouched — some diagram types use them.
pub fn sanitize(raw: &str) -> String {
    let defenced = FENCE.replace_all(raw, "");

    let lines: Vec<&str> = defenced.lines().collect();
    let mut start = 0;
    let mut end = lines.len();
    while start < end && strippable(lines[start]) {
        start += 1;
    }
    while end > start && strippable(lines[end - 1]) {
        end -= 1;
    }

    lines[start..end].join("\n").trim().to_string()
}

/// Blank, or a separator run of three-plus dashes.
fn strippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || (trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_mermaid_fences() {
        assert_eq!(sanitize("```mermaid\ngraph TD\nA-->B\n```"), "graph TD\nA-->B");
    }

    #[test]
    fn strips_fences_and_separator_lines() {
        let input = "```mermaid\n---\nsequenceDiagram\nAlice->>Bob: Hi\n---\n```";
        assert_eq!(sanitize(input), "sequenceDiagram\nAlice->>Bob: Hi");
    }

    #[test]
    fn strips_surrounding_blank_lines() {
        assert_eq!(sanitize("\n\n  \ngraph LR\nA-->B\n\n"), "graph LR\nA-->B");
    }

    #[test]
    fn keeps_interior_separator_lines() {
        // Frontmatter-style separators inside the body belong to the diagram.
        let input = "graph TD\n---\nA-->B";
        assert_eq!(sanitize(input), "graph TD\n---\nA-->B");
    }

    #[test]
    fn clean_input_passes_through() {
        let input = "graph TD\nA[Start] --> B{Decision?}";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn two_dashes_are_not_a_separator() {
        assert_eq!(sanitize("--\ngraph TD\nA-->B"), "--\ngraph TD\nA-->B");
    }

    #[test]
    fn all_decoration_sanitizes_to_empty() {
        assert_eq!(sanitize("```mermaid\n---\n\n---\n```"), "");
        assert_eq!(sanitize(""), "");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(input in "\\PC{0,200}") {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once.clone());
        }

        #[test]
        fn sanitize_is_idempotent_multiline(lines in proptest::collection::vec("[a-zA-Z`\\-> ]{0,12}", 0..8)) {
            let input = lines.join("\n");
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once.clone());
        }

        #[test]
        fn output_never_keeps_fences_or_edge_separators(input in "\\PC{0,200}") {
            let out = sanitize(&input);
            prop_assert!(!out.contains("```"));
            if let Some(first) = out.lines().next() {
                prop_assert!(!strippable(first));
            }
            if let Some(last) = out.lines().last() {
                prop_assert!(!strippable(last));
            }
        }
    }
}
