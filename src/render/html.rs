use super::Segment;

/// HTML for a segment list. All model text is escaped; the only markup in the
/// output is the fixed set of tags emitted here.
pub fn to_html(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut in_list = false;

    for segment in segments {
        let is_item = matches!(segment, Segment::ListItem { .. });
        if in_list && !is_item {
            out.push_str("</ul>");
            in_list = false;
        } else if is_item && !in_list {
            out.push_str("<ul>");
            in_list = true;
        }

        match segment {
            Segment::CodeBlock { language, text } => {
                match language {
                    Some(language) => out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_html(language)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape_html(text));
                out.push_str("</code></pre>");
            }
            Segment::Heading { level, text } => {
                let level = (*level).clamp(1, 6);
                out.push_str(&format!("<h{level}>{}</h{level}>", escape_html(text)));
            }
            Segment::ListItem { text } => {
                out.push_str(&format!("<li>{}</li>", escape_html(text)));
            }
            Segment::Paragraph { text } => {
                out.push_str(&format!("<p>{}</p>", escape_html(text)));
            }
        }
    }

    if in_list {
        out.push_str("</ul>");
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
