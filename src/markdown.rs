//! Markdown article → plain `{title, body}`.
//!
//! Handbook pages carry a title (front matter `title:` or the first ATX
//! heading) and free-form markdown. Ranking and snippets need a uniform text
//! view, so markup is flattened to plain text here, before tokenization.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::LoadError;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}(?:\s+(.*?))?\s*#*\s*$").expect("valid regex"));
static BLOCK_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:>\s?|[-*+]\s+|\d+[.)]\s+)").expect("valid regex"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\](?:\([^)]*\)|\[[^\]]*\])").expect("valid regex"));
static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Title and flattened body of one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: String,
    pub body: String,
}

/// Parse an article. `path` is only used in error messages.
pub fn parse_article(path: &str, text: &str) -> Result<ParsedArticle, LoadError> {
    let malformed = |reason: &str| LoadError::Malformed {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if text.contains('\0') {
        return Err(malformed("binary content"));
    }

    let text = text.strip_prefix('\u{feff}').unwrap_or(text).replace("\r\n", "\n");
    let mut lines: Vec<&str> = text.lines().collect();

    let mut title: Option<String> = None;
    if lines.first().is_some_and(|l| l.trim_end() == "---") {
        let close = lines
            .iter()
            .skip(1)
            .position(|l| matches!(l.trim_end(), "---" | "..."))
            .map(|i| i + 1)
            .ok_or_else(|| malformed("unterminated front matter"))?;
        for line in &lines[1..close] {
            if let Some((key, value)) = line.split_once(':')
                && key.trim().eq_ignore_ascii_case("title")
            {
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                if !value.is_empty() {
                    title = Some(flatten_inline(value));
                }
            }
        }
        lines.drain(..=close);
    }

    let mut body_lines: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            body_lines.push(WHITESPACE_RE.replace_all(trimmed, " ").into_owned());
            continue;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            let heading = caps.get(1).map(|m| flatten_inline(m.as_str())).unwrap_or_default();
            if title.is_none() {
                if heading.is_empty() {
                    return Err(malformed("empty title heading"));
                }
                title = Some(heading);
            } else if !heading.is_empty() {
                body_lines.push(heading);
            }
            continue;
        }

        if is_rule_or_table_separator(trimmed) {
            continue;
        }

        let mut rest = line;
        while let Some(m) = BLOCK_MARKER_RE.find(rest) {
            if m.end() == 0 {
                break;
            }
            rest = &rest[m.end()..];
        }
        body_lines.push(flatten_inline(rest));
    }

    let title = title.ok_or_else(|| malformed("no title heading"))?;

    Ok(ParsedArticle { title, body: join_paragraphs(&body_lines) })
}

/// Strip inline markup from a single line.
fn flatten_inline(line: &str) -> String {
    let s = IMAGE_RE.replace_all(line, "$1");
    let s = LINK_RE.replace_all(&s, "$1");
    let s = HTML_TAG_RE.replace_all(&s, "");
    let s = s
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace(['*', '`'], "")
        .replace('|', " ");
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

/// `---`, `***`, `___`, or a table header separator like `|---|:--:|`.
fn is_rule_or_table_separator(trimmed: &str) -> bool {
    if trimmed.len() < 3 {
        return false;
    }
    let only_rule_chars = trimmed
        .chars()
        .all(|c| matches!(c, '-' | '*' | '_' | '|' | ':' | ' ' | '\t'));
    let markers = trimmed.chars().filter(|c| matches!(c, '-' | '*' | '_')).count();
    only_rule_chars && markers >= 3
}

/// Join lines, collapsing runs of blank lines into one paragraph break.
fn join_paragraphs(lines: &[String]) -> String {
    let mut out = String::new();
    let mut pending_break = false;
    for line in lines {
        if line.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        pending_break = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_becomes_title() {
        let a = parse_article("a.md", "# Anchors\n\nMark to base positioning uses anchors.").unwrap();
        assert_eq!(a.title, "Anchors");
        assert_eq!(a.body, "Mark to base positioning uses anchors.");
    }

    #[test]
    fn test_front_matter_title_wins() {
        let text = "---\ntitle: \"Kerning Groups\"\nslug: kerning\n---\n# Kerning\n\nGroups reduce pairs.";
        let a = parse_article("k.md", text).unwrap();
        assert_eq!(a.title, "Kerning Groups");
        // the first heading becomes body text once a title is known
        assert_eq!(a.body, "Kerning\n\nGroups reduce pairs.");
    }

    #[test]
    fn test_unterminated_front_matter_is_malformed() {
        let err = parse_article("bad.md", "---\ntitle: Oops\n\nno closing").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { ref reason, .. } if reason.contains("front matter")));
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let err = parse_article("notitle.md", "just some text").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { ref path, .. } if path == "notitle.md"));
    }

    #[test]
    fn test_empty_heading_is_malformed() {
        assert!(parse_article("e.md", "#\n\ntext").is_err());
    }

    #[test]
    fn test_binary_content_is_malformed() {
        assert!(parse_article("b.md", "# T\n\0\0").is_err());
    }

    #[test]
    fn test_links_images_and_html_flattened() {
        let text = "# Shortcuts\n\nPress <kbd>Cmd</kbd>-<kbd>E</kbd> to see [the palette](palette.md). ![Palette window](img/p.png)";
        let a = parse_article("s.md", text).unwrap();
        assert_eq!(a.body, "Press Cmd-E to see the palette. Palette window");
    }

    #[test]
    fn test_lists_quotes_and_emphasis_flattened() {
        let text = "# Features\n\n- **smcp** small caps\n1. `liga` ligatures\n> *Note:* tags are case sensitive";
        let a = parse_article("f.md", text).unwrap();
        assert_eq!(a.body, "smcp small caps\nliga ligatures\nNote: tags are case sensitive");
    }

    #[test]
    fn test_code_fence_content_kept_markers_dropped() {
        let text = "# Code\n\n```python\nfor g in font.glyphs:\n```\nafter";
        let a = parse_article("c.md", text).unwrap();
        assert_eq!(a.body, "for g in font.glyphs:\nafter");
    }

    #[test]
    fn test_heading_inside_fence_is_not_title() {
        let text = "```\n# comment\n```\n# Real Title\nbody";
        let a = parse_article("c.md", text).unwrap();
        assert_eq!(a.title, "Real Title");
        assert_eq!(a.body, "# comment\nbody");
    }

    #[test]
    fn test_tables_and_rules() {
        let text = "# Table\n\n| Key | Action |\n|-----|:------:|\n| Cmd-K | Kerning |\n\n---\n\nend";
        let a = parse_article("t.md", text).unwrap();
        assert_eq!(a.body, "Key Action\nCmd-K Kerning\n\nend");
    }

    #[test]
    fn test_blank_line_runs_collapse() {
        let a = parse_article("p.md", "# P\n\n\n\none\n\n\n\ntwo\n\n").unwrap();
        assert_eq!(a.body, "one\n\ntwo");
    }

    #[test]
    fn test_crlf_and_bom() {
        let a = parse_article("w.md", "\u{feff}# Windows\r\nline one\r\nline two").unwrap();
        assert_eq!(a.title, "Windows");
        assert_eq!(a.body, "line one\nline two");
    }

    #[test]
    fn test_empty_body_allowed() {
        let a = parse_article("e.md", "# Only a Title").unwrap();
        assert_eq!(a.title, "Only a Title");
        assert!(a.body.is_empty());
    }
}
