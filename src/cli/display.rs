use super::theme::Theme;
use crate::config::ThemeToken;
use crate::render::Segment;
use std::fmt::Write;

const CODE_INDENT: &str = "    ";

/// Formats rendered segments for the terminal. Consecutive list items stay
/// together; every other segment is separated by a blank line.
pub(crate) fn format_segments(theme: &Theme, segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Segment> = None;

    for segment in segments {
        let joined_list = matches!(
            (previous, segment),
            (Some(Segment::ListItem { .. }), Segment::ListItem { .. })
        );
        if previous.is_some() && !joined_list {
            out.push('\n');
        }
        write_segment(&mut out, theme, segment);
        previous = Some(segment);
    }

    out
}

fn write_segment(out: &mut String, theme: &Theme, segment: &Segment) {
    match segment {
        Segment::Heading { level, text } => {
            let marker = "#".repeat(usize::from(*level));
            let heading = format!("{marker} {text}");
            let _ = writeln!(out, "{}", theme.paint(ThemeToken::Heading, heading));
        }
        Segment::CodeBlock { language, text } => {
            if let Some(language) = language {
                let _ = writeln!(out, "{}", theme.paint(ThemeToken::CodeLanguage, language));
            }
            for line in text.lines() {
                let _ = writeln!(
                    out,
                    "{}",
                    theme.paint(ThemeToken::CodeBlock, format!("{CODE_INDENT}{line}"))
                );
            }
        }
        Segment::ListItem { text } => {
            let _ = writeln!(
                out,
                "  {} {}",
                theme.paint(ThemeToken::ListBullet, "•"),
                theme.paint(ThemeToken::Paragraph, text)
            );
        }
        Segment::Paragraph { text } => {
            for line in text.lines() {
                let _ = writeln!(out, "{}", theme.paint(ThemeToken::Paragraph, line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::format_segments;
    use crate::cli::theme::Theme;
    use crate::render::render;

    #[test]
    fn plain_output_for_mixed_reply() {
        let segments = render(Some(
            "## Summary\n\nIt adds numbers.\n\n- fast\n- small\n\n```rust\nfn add() {}\n```",
        ));
        let text = format_segments(&Theme::new(false), &segments);

        insta::assert_snapshot!(text.trim_end(), @r"
        ## Summary

        It adds numbers.

          • fast
          • small

        rust
            fn add() {}
        ");
    }

    #[test]
    fn empty_input_formats_to_nothing() {
        assert_eq!(format_segments(&Theme::new(false), &render(None)), "");
    }

    #[test]
    fn enabled_theme_emits_escape_sequences() {
        let segments = render(Some("hello"));
        let text = format_segments(&Theme::new(true), &segments);
        assert!(text.contains("\u{1b}["));
        assert!(text.contains("hello"));
    }
}
