//! Fenced-code-block extraction from a page's markdown (spec §4.6
//! phase 4).

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct FencedCode {
    pub language: Option<String>,
    pub content: String,
}

/// Finds every fenced code block (` ```lang\n...\n``` `) in `markdown`,
/// in document order.
pub fn extract_fenced_code(markdown: &str) -> Vec<FencedCode> {
    // (?s) lets `.` cross newlines inside the fence body.
    let re = Regex::new(r"(?s)```([A-Za-z0-9_+-]*)\n(.*?)```").expect("static regex is valid");
    re.captures_iter(markdown)
        .filter_map(|caps| {
            let content = caps.get(2)?.as_str().trim_end().to_string();
            if content.is_empty() {
                return None;
            }
            let lang = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            Some(FencedCode {
                language: if lang.is_empty() { None } else { Some(lang.to_string()) },
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_block_with_language() {
        let md = "intro\n```python\nprint('hi')\n```\nafter";
        let blocks = extract_fenced_code(md);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language.as_deref(), Some("python"));
        assert_eq!(blocks[0].content, "print('hi')");
    }

    #[test]
    fn extracts_multiple_blocks_in_order() {
        let md = "```rust\nfn a() {}\n```\ntext\n```go\nfunc b() {}\n```";
        let blocks = extract_fenced_code(md);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("rust"));
        assert_eq!(blocks[1].language.as_deref(), Some("go"));
    }

    #[test]
    fn ignores_empty_blocks() {
        let md = "```\n\n```";
        assert!(extract_fenced_code(md).is_empty());
    }

    #[test]
    fn no_fences_yields_no_blocks() {
        assert!(extract_fenced_code("just plain text").is_empty());
    }
}
