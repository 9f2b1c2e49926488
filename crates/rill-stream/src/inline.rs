//! Inline span tokenizer.
//!
//! Splits one line into an ordered run of inline events (text, bold, italic,
//! inline code, link, image) with no gaps. Matching is leftmost-first and
//! non-overlapping; an opener without a closer never matches, so its
//! characters stay in the surrounding text event.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{EventKind, ParseEvent, Position};

/// Alternation order is the match priority: image, link, bold, italic, code.
static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"!\[([^\]]*)\]\(([^)]+)\)|\[([^\]]+)\]\(([^)]+)\)|\*\*([^*]+)\*\*|\*([^*]+)\*|`([^`]+)`",
    )
    .unwrap()
});

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\(([^)]+)\)$").unwrap());

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)$").unwrap());

fn kind_for(caps: &Captures<'_>) -> EventKind {
    if caps.get(2).is_some() {
        EventKind::Image
    } else if caps.get(4).is_some() {
        EventKind::Link
    } else if caps.get(5).is_some() {
        EventKind::Bold
    } else if caps.get(6).is_some() {
        EventKind::Italic
    } else {
        EventKind::CodeInline
    }
}

/// Tokenize a single line of inline content.
///
/// `base` is the position of the first character of `line`. Returns an empty
/// vector for an empty line.
pub fn tokenize_inline(line: &str, base: Position) -> Vec<ParseEvent> {
    let mut events = Vec::new();
    // Byte cursor and the number of chars before it.
    let mut cursor = 0;
    let mut cursor_chars = 0;

    for caps in INLINE_RE.captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let gap = &line[cursor..whole.start()];
        if !gap.is_empty() {
            events.push(ParseEvent::new(
                EventKind::Text,
                gap,
                base.shifted(cursor_chars),
            ));
            cursor_chars += gap.chars().count();
        }

        events.push(ParseEvent::new(
            kind_for(&caps),
            whole.as_str(),
            base.shifted(cursor_chars),
        ));
        cursor_chars += whole.as_str().chars().count();
        cursor = whole.end();
    }

    if cursor < line.len() {
        events.push(ParseEvent::new(
            EventKind::Text,
            &line[cursor..],
            base.shifted(cursor_chars),
        ));
    }

    events
}

/// Inner text of a delimited span (`**x**`, `*x*`, `` `x` ``).
///
/// Returns `raw` unchanged if the delimiters are not present.
pub(crate) fn strip_delimiters(kind: EventKind, raw: &str) -> &str {
    let delimiter = match kind {
        EventKind::Bold => "**",
        EventKind::Italic => "*",
        EventKind::CodeInline => "`",
        _ => return raw,
    };
    raw.strip_prefix(delimiter)
        .and_then(|rest| rest.strip_suffix(delimiter))
        .unwrap_or(raw)
}

/// Split `[label](url)` into `(label, url)`.
pub(crate) fn split_link(raw: &str) -> Option<(&str, &str)> {
    let caps = LINK_RE.captures(raw)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Split `![alt](src)` into `(alt, src)`.
pub(crate) fn split_image(raw: &str) -> Option<(&str, &str)> {
    let caps = IMAGE_RE.captures(raw)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(line: &str) -> Vec<(EventKind, String)> {
        tokenize_inline(line, Position::START)
            .into_iter()
            .map(|e| (e.kind, e.raw))
            .collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            kinds("hello world"),
            vec![(EventKind::Text, "hello world".to_owned())]
        );
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize_inline("", Position::START).is_empty());
    }

    #[test]
    fn test_mixed_spans() {
        assert_eq!(
            kinds("**bold** *italic* `code`"),
            vec![
                (EventKind::Bold, "**bold**".to_owned()),
                (EventKind::Text, " ".to_owned()),
                (EventKind::Italic, "*italic*".to_owned()),
                (EventKind::Text, " ".to_owned()),
                (EventKind::CodeInline, "`code`".to_owned()),
            ]
        );
    }

    #[test]
    fn test_link_and_image() {
        assert_eq!(
            kinds("see [a](https://a.com) and ![b](b.png)"),
            vec![
                (EventKind::Text, "see ".to_owned()),
                (EventKind::Link, "[a](https://a.com)".to_owned()),
                (EventKind::Text, " and ".to_owned()),
                (EventKind::Image, "![b](b.png)".to_owned()),
            ]
        );
    }

    #[test]
    fn test_image_wins_over_link() {
        assert_eq!(
            kinds("![alt](x.png)"),
            vec![(EventKind::Image, "![alt](x.png)".to_owned())]
        );
    }

    #[test]
    fn test_unclosed_bold_stays_text() {
        assert_eq!(
            kinds("**bold without close"),
            vec![(EventKind::Text, "**bold without close".to_owned())]
        );
    }

    #[test]
    fn test_unclosed_code_stays_text() {
        assert_eq!(
            kinds("run `cargo"),
            vec![(EventKind::Text, "run `cargo".to_owned())]
        );
    }

    #[test]
    fn test_no_gaps() {
        let line = "a **b** c [d](e) `f` g";
        let rebuilt: String = tokenize_inline(line, Position::START)
            .into_iter()
            .map(|e| e.raw)
            .collect();
        assert_eq!(rebuilt, line);
    }

    #[test]
    fn test_positions_count_codepoints() {
        let base = Position {
            line: 4,
            column: 3,
            offset: 20,
        };
        let events = tokenize_inline("é **x**", base);
        assert_eq!(events[1].kind, EventKind::Bold);
        assert_eq!(
            events[1].position,
            Position {
                line: 4,
                column: 5,
                offset: 22,
            }
        );
    }

    #[test]
    fn test_strip_delimiters() {
        assert_eq!(strip_delimiters(EventKind::Bold, "**x**"), "x");
        assert_eq!(strip_delimiters(EventKind::Italic, "*y*"), "y");
        assert_eq!(strip_delimiters(EventKind::CodeInline, "`z`"), "z");
        assert_eq!(strip_delimiters(EventKind::Text, "**t**"), "**t**");
    }

    #[test]
    fn test_split_link_and_image() {
        assert_eq!(split_link("[docs](https://d.io)"), Some(("docs", "https://d.io")));
        assert_eq!(split_image("![](pic.png)"), Some(("", "pic.png")));
        assert_eq!(split_link("plain"), None);
    }
}
