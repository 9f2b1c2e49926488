//! Line classifiers.
//!
//! Pure functions that recognize block-level constructs on a single,
//! complete line (without its trailing newline).

/// Opening code fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFence {
    /// Number of backticks in the opener (minimum length for the closer).
    pub len: usize,
    /// Info string after the backticks, if any.
    pub language: Option<String>,
}

/// Heading line: `#` to `######` followed by whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading<'a> {
    pub depth: u8,
    /// Text after the marker and its whitespace.
    pub content: &'a str,
    /// Chars before `content` on the line.
    pub content_offset: usize,
}

/// List item line: `-`, `*`, `+` or `N.` followed by whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItem<'a> {
    pub ordered: bool,
    pub content: &'a str,
    pub content_offset: usize,
}

/// Blockquote line: `>` with one optional following space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blockquote<'a> {
    pub content: &'a str,
    pub content_offset: usize,
}

/// Detect an opening code fence (three or more backticks).
pub fn parse_code_fence(line: &str) -> Option<CodeFence> {
    let trimmed = line.trim();
    let len = trimmed.chars().take_while(|&c| c == '`').count();
    if len < 3 {
        return None;
    }

    let info = trimmed[len..].trim();
    Some(CodeFence {
        len,
        language: (!info.is_empty()).then(|| info.to_owned()),
    })
}

/// Check if a line closes a fence opened with `min_len` backticks.
///
/// The closer must be at least as long as the opener and contain only
/// backticks, optionally followed by whitespace.
pub fn is_closing_fence(line: &str, min_len: usize) -> bool {
    let trimmed = line.trim_start();
    let count = trimmed.chars().take_while(|&c| c == '`').count();
    if count < min_len.max(3) {
        return false;
    }
    trimmed[count..].chars().all(char::is_whitespace)
}

/// Check if a line opens a directive: `:::` followed by a header.
///
/// A line made only of colons is a close marker, not an opener.
pub fn is_directive_open(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(":::") && !trimmed.chars().all(|c| c == ':')
}

/// Check if a line closes the current directive body.
///
/// The whole trimmed line must equal `:::`; a line that merely contains the
/// marker is body content.
pub fn is_directive_close(line: &str) -> bool {
    line.trim() == ":::"
}

/// Horizontal rule: three or more `-`, `*` or `_` and nothing else.
pub fn is_horizontal_rule(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_')
        && trimmed.len() >= 3
        && trimmed.chars().all(|c| c == first)
}

pub fn parse_heading(line: &str) -> Option<Heading<'_>> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }

    let after = &line[hashes..];
    let content = after.trim_start();
    let spaces = after.len() - content.len();
    if spaces == 0 {
        return None;
    }

    Some(Heading {
        depth: u8::try_from(hashes).ok()?,
        content,
        content_offset: hashes + after[..spaces].chars().count(),
    })
}

pub fn parse_list_item(line: &str) -> Option<ListItem<'_>> {
    let body = line.trim_start();
    let indent = line[..line.len() - body.len()].chars().count();

    let (ordered, marker_len) = match body.chars().next()? {
        '-' | '*' | '+' => (false, 1),
        c if c.is_ascii_digit() => {
            let digits = body.chars().take_while(char::is_ascii_digit).count();
            if !body[digits..].starts_with('.') {
                return None;
            }
            (true, digits + 1)
        }
        _ => return None,
    };

    let after = &body[marker_len..];
    let content = after.trim_start();
    let spaces = after.len() - content.len();
    if spaces == 0 {
        return None;
    }

    Some(ListItem {
        ordered,
        content,
        content_offset: indent + marker_len + after[..spaces].chars().count(),
    })
}

pub fn parse_blockquote(line: &str) -> Option<Blockquote<'_>> {
    let body = line.trim_start();
    let indent = line[..line.len() - body.len()].chars().count();
    let after = body.strip_prefix('>')?;
    let (content, skipped) = match after.strip_prefix(' ') {
        Some(rest) => (rest, 2),
        None => (after, 1),
    };

    Some(Blockquote {
        content,
        content_offset: indent + skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_fence_with_language() {
        let fence = parse_code_fence("```rust").unwrap();
        assert_eq!(fence.len, 3);
        assert_eq!(fence.language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_code_fence_without_language() {
        let fence = parse_code_fence("  ````  ").unwrap();
        assert_eq!(fence.len, 4);
        assert_eq!(fence.language, None);
    }

    #[test]
    fn test_not_a_fence() {
        assert!(parse_code_fence("``").is_none());
        assert!(parse_code_fence("text ```").is_none());
    }

    #[test]
    fn test_closing_fence() {
        assert!(is_closing_fence("```", 3));
        assert!(is_closing_fence("````  ", 3));
        assert!(!is_closing_fence("```", 4));
        assert!(!is_closing_fence("```js", 3));
        assert!(!is_closing_fence("code", 3));
    }

    #[test]
    fn test_directive_markers() {
        assert!(is_directive_open("::: card"));
        assert!(is_directive_open(":::card{a: 1}"));
        assert!(!is_directive_open(":::"));
        assert!(!is_directive_open("::::"));
        assert!(!is_directive_open("text ::: card"));

        assert!(is_directive_close(":::"));
        assert!(is_directive_close("  :::  "));
        assert!(!is_directive_close("title: \":::\""));
        assert!(!is_directive_close("::::"));
    }

    #[test]
    fn test_horizontal_rule() {
        assert!(is_horizontal_rule("---"));
        assert!(is_horizontal_rule(" *****"));
        assert!(is_horizontal_rule("___"));
        assert!(!is_horizontal_rule("--"));
        assert!(!is_horizontal_rule("-*-"));
        assert!(!is_horizontal_rule("- item"));
    }

    #[test]
    fn test_heading_depths() {
        for depth in 1..=6u8 {
            let line = format!("{} Title", "#".repeat(depth as usize));
            let heading = parse_heading(&line).unwrap();
            assert_eq!(heading.depth, depth);
            assert_eq!(heading.content, "Title");
            assert_eq!(heading.content_offset, depth as usize + 1);
        }
    }

    #[test]
    fn test_not_heading() {
        assert!(parse_heading("#NoSpace").is_none());
        assert!(parse_heading("####### seven").is_none());
        assert!(parse_heading(" # indented").is_none());
    }

    #[test]
    fn test_list_items() {
        let item = parse_list_item("- apples").unwrap();
        assert!(!item.ordered);
        assert_eq!(item.content, "apples");
        assert_eq!(item.content_offset, 2);

        let item = parse_list_item("  12. twelve").unwrap();
        assert!(item.ordered);
        assert_eq!(item.content, "twelve");
        assert_eq!(item.content_offset, 6);

        assert!(parse_list_item("+ plus").is_some());
        assert!(parse_list_item("**bold**").is_none());
        assert!(parse_list_item("12 apples").is_none());
        assert!(parse_list_item("-dash").is_none());
    }

    #[test]
    fn test_blockquote() {
        let quote = parse_blockquote("> quoted").unwrap();
        assert_eq!(quote.content, "quoted");
        assert_eq!(quote.content_offset, 2);

        let quote = parse_blockquote(">tight").unwrap();
        assert_eq!(quote.content, "tight");
        assert_eq!(quote.content_offset, 1);

        assert!(parse_blockquote("not > quote").is_none());
    }
}
