//! Directive header grammar.
//!
//! Parses the opening line of a directive block:
//!
//! ```text
//! ::: <name>[ { key: value, ... } ]
//! ```
//!
//! The name is a single token of letters, digits and hyphens. Anything other
//! than one brace block after the name makes the header invalid.

/// Parsed directive opening line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveHeader {
    pub name: String,
    /// Text between the braces of the inline attribute block, if present.
    pub inline_attributes: Option<String>,
}

/// Parse a directive opening line.
///
/// Returns `None` if the line is not a well-formed header: missing `:::`,
/// empty or invalid name, or extra tokens outside the brace block.
pub fn parse_directive_header(line: &str) -> Option<DirectiveHeader> {
    let trimmed = line.trim();
    let after_colons = trimmed.strip_prefix(":::")?.trim_start();

    let name_end = after_colons
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(after_colons.len());
    let name = &after_colons[..name_end];
    if !is_valid_directive_name(name) {
        return None;
    }

    let rest = after_colons[name_end..].trim();
    if rest.is_empty() {
        return Some(DirectiveHeader {
            name: name.to_owned(),
            inline_attributes: None,
        });
    }

    let (attrs, consumed) = parse_braces(rest)?;
    if !rest[consumed..].trim().is_empty() {
        return None;
    }

    Some(DirectiveHeader {
        name: name.to_owned(),
        inline_attributes: Some(attrs.to_owned()),
    })
}

/// Valid names contain only alphanumeric characters and hyphens.
pub fn is_valid_directive_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '-')
}

/// Extract the contents of a leading `{...}` block, handling nesting.
///
/// Returns (contents without braces, bytes consumed), or `None` if the
/// string does not start with `{` or the block is unclosed.
fn parse_braces(s: &str) -> Option<(&str, usize)> {
    if !s.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], i + 1));
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_header() {
        let header = parse_directive_header("::: card").unwrap();
        assert_eq!(header.name, "card");
        assert_eq!(header.inline_attributes, None);
    }

    #[test]
    fn test_header_without_space() {
        let header = parse_directive_header(":::stats-card").unwrap();
        assert_eq!(header.name, "stats-card");
    }

    #[test]
    fn test_header_with_inline_attributes() {
        let header = parse_directive_header("::: card { mode: dark, value: 1 }").unwrap();
        assert_eq!(header.name, "card");
        assert_eq!(
            header.inline_attributes.as_deref(),
            Some(" mode: dark, value: 1 ")
        );
    }

    #[test]
    fn test_attributes_directly_after_name() {
        let header = parse_directive_header("::: card{a: {b: 1}}").unwrap();
        assert_eq!(header.inline_attributes.as_deref(), Some("a: {b: 1}"));
    }

    #[test]
    fn test_extra_tokens_invalid() {
        assert!(parse_directive_header("::: stats card").is_none());
        assert!(parse_directive_header("::: bad name").is_none());
        assert!(parse_directive_header("::: card {a: 1} trailing").is_none());
    }

    #[test]
    fn test_unclosed_brace_invalid() {
        assert!(parse_directive_header("::: card { a: 1").is_none());
    }

    #[test]
    fn test_not_a_header() {
        assert!(parse_directive_header("card").is_none());
        assert!(parse_directive_header(":::").is_none());
        assert!(parse_directive_header("::: {a: 1}").is_none());
    }

    #[test]
    fn test_is_valid_directive_name() {
        assert!(is_valid_directive_name("card"));
        assert!(is_valid_directive_name("stats-card"));
        assert!(is_valid_directive_name("chart2"));
        assert!(!is_valid_directive_name(""));
        assert!(!is_valid_directive_name("foo@bar"));
        assert!(!is_valid_directive_name("foo_bar"));
        assert!(!is_valid_directive_name("::"));
    }

    #[test]
    fn test_parse_braces() {
        assert_eq!(parse_braces("{a}"), Some(("a", 3)));
        assert_eq!(parse_braces("{a {b}} rest"), Some(("a {b}", 7)));
        assert_eq!(parse_braces("no braces"), None);
        assert_eq!(parse_braces("{unclosed"), None);
    }
}
