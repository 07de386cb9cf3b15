use regex::Regex;
use std::sync::LazyLock;

static FIRST_FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\n(.*?)\n```").expect("fenced block pattern is valid")
});

/// Content of the first fenced code block, trimmed; the whole text trimmed
/// when there is none.
pub fn extract_code_block(text: &str) -> String {
    FIRST_FENCED_BLOCK
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map_or(text, |code| code.as_str())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::extract_code_block;

    #[test]
    fn extracts_tagged_block() {
        assert_eq!(extract_code_block("```js\nconsole.log(1)\n```"), "console.log(1)");
    }

    #[test]
    fn extracts_first_block_and_ignores_prose() {
        let text = "Here you go:\n```python\n  total = sum(arr)  \n```\nand also\n```rust\nlet x = 1;\n```";
        assert_eq!(extract_code_block(text), "total = sum(arr)");
    }

    #[test]
    fn falls_back_to_trimmed_text_without_block() {
        assert_eq!(
            extract_code_block("  def f():\n    return 1\n\n"),
            "def f():\n    return 1"
        );
    }

    #[test]
    fn language_tag_with_symbols_does_not_match() {
        let text = "```c++\nint x;\n```";
        assert_eq!(extract_code_block(text), text);
    }
}
