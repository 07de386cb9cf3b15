//! Markdown-subset renderer for model replies.
//!
//! Replies become a list of [`Segment`]s instead of markup. Passes run in a
//! fixed order: fenced code blocks are cut out first, then the remaining text
//! is classified line by line into headings, list items and paragraphs.

mod html;

pub use html::{escape_html, to_html};

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z]*)\n(.*?)\n```").expect("fenced block pattern is valid")
});

const HEADING_PREFIX: &str = "## ";
const LIST_PREFIX: &str = "- ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    ListItem {
        text: String,
    },
    Paragraph {
        text: String,
    },
}

pub fn render(text: Option<&str>) -> Vec<Segment> {
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        return Vec::new();
    };
    let text = text.replace("\r\n", "\n");

    let mut segments = Vec::new();
    let mut cursor = 0;
    for captures in FENCED_BLOCK.captures_iter(&text) {
        let Some(block) = captures.get(0) else {
            continue;
        };
        render_lines(&text[cursor..block.start()], &mut segments);

        let language = captures
            .get(1)
            .map(|tag| tag.as_str())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);
        let code = captures.get(2).map_or("", |body| body.as_str());
        segments.push(Segment::CodeBlock {
            language,
            text: code.to_string(),
        });
        cursor = block.end();
    }
    render_lines(&text[cursor..], &mut segments);

    segments
}

fn render_lines(text: &str, segments: &mut Vec<Segment>) {
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.split('\n').map(str::trim_end) {
        if line.trim_start().is_empty() {
            flush_paragraph(&mut paragraph, segments);
        } else if let Some(rest) = line.strip_prefix(HEADING_PREFIX) {
            flush_paragraph(&mut paragraph, segments);
            segments.push(Segment::Heading {
                level: 2,
                text: rest.trim().to_string(),
            });
        } else if let Some(rest) = line.strip_prefix(LIST_PREFIX) {
            flush_paragraph(&mut paragraph, segments);
            segments.push(Segment::ListItem {
                text: rest.trim().to_string(),
            });
        } else {
            paragraph.push(line);
        }
    }

    flush_paragraph(&mut paragraph, segments);
}

fn flush_paragraph(paragraph: &mut Vec<&str>, segments: &mut Vec<Segment>) {
    if paragraph.is_empty() {
        return;
    }
    segments.push(Segment::Paragraph {
        text: paragraph.join("\n"),
    });
    paragraph.clear();
}

/// Canonical markdown for a segment list; `render` maps it back to the same
/// segments.
pub fn to_markdown(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::CodeBlock { language, text } => {
                format!("```{}\n{text}\n```", language.as_deref().unwrap_or(""))
            }
            Segment::Heading { level, text } => {
                format!("{} {text}", "#".repeat(usize::from(*level)))
            }
            Segment::ListItem { text } => format!("{LIST_PREFIX}{text}"),
            Segment::Paragraph { text } => text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::{Segment, render, to_markdown};

    fn heading(text: &str) -> Segment {
        Segment::Heading {
            level: 2,
            text: text.to_string(),
        }
    }

    fn paragraph(text: &str) -> Segment {
        Segment::Paragraph {
            text: text.to_string(),
        }
    }

    fn item(text: &str) -> Segment {
        Segment::ListItem {
            text: text.to_string(),
        }
    }

    #[test]
    fn missing_or_empty_input_renders_nothing() {
        assert!(render(None).is_empty());
        assert!(render(Some("")).is_empty());
        assert!(render(Some("\n\n  \n")).is_empty());
    }

    #[test]
    fn heading_then_paragraph() {
        assert_eq!(
            render(Some("## Title\n\nBody")),
            vec![heading("Title"), paragraph("Body")]
        );
    }

    #[test]
    fn list_items_break_out_of_paragraphs() {
        assert_eq!(
            render(Some("Steps:\n- install\n-  build \nDone")),
            vec![
                paragraph("Steps:"),
                item("install"),
                item("build"),
                paragraph("Done"),
            ]
        );
    }

    #[test]
    fn single_newlines_stay_inside_a_paragraph() {
        assert_eq!(
            render(Some("line one\nline two\n\nnext")),
            vec![paragraph("line one\nline two"), paragraph("next")]
        );
    }

    #[test]
    fn fenced_block_contents_are_not_reinterpreted() {
        let text = "Intro\n```python\n## not a heading\n- not an item\n```\nOutro";
        assert_eq!(
            render(Some(text)),
            vec![
                paragraph("Intro"),
                Segment::CodeBlock {
                    language: Some("python".to_string()),
                    text: "## not a heading\n- not an item".to_string(),
                },
                paragraph("Outro"),
            ]
        );
    }

    #[test]
    fn fenced_block_without_language_tag() {
        assert_eq!(
            render(Some("```\nplain\n```")),
            vec![Segment::CodeBlock {
                language: None,
                text: "plain".to_string(),
            }]
        );
    }

    #[test]
    fn unterminated_fence_is_plain_text() {
        assert_eq!(
            render(Some("```js\nconsole.log(1)")),
            vec![paragraph("```js\nconsole.log(1)")]
        );
    }

    #[test]
    fn hash_without_space_and_deeper_headings_are_paragraphs() {
        assert_eq!(
            render(Some("##Title\n\n### Sub")),
            vec![paragraph("##Title"), paragraph("### Sub")]
        );
    }

    #[test]
    fn crlf_line_endings_are_normalized() {
        assert_eq!(
            render(Some("## A\r\n\r\n- b\r\n")),
            vec![heading("A"), item("b")]
        );
    }

    #[test]
    fn markup_is_kept_as_literal_text() {
        assert_eq!(
            render(Some("<script>alert(1)</script>")),
            vec![paragraph("<script>alert(1)</script>")]
        );
    }

    #[test]
    fn rendering_canonical_markdown_is_stable() {
        let reply = "## Overview\nThis function fetches data.\n\n- uses `fetch`\n- checks `ok`\n\n```js\nconst r = await fetch(url);\n\nreturn r.json();\n```\nThat's all.";
        let segments = render(Some(reply));
        assert_eq!(segments.len(), 6);
        assert_eq!(render(Some(&to_markdown(&segments))), segments);
    }

    #[test]
    fn segments_serialize_with_kind_tag() {
        let value = serde_json::to_value(render(Some("## Hi"))).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!([{"kind": "heading", "level": 2, "text": "Hi"}])
        );
    }
}
