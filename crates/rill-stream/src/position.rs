//! Source position tracking.

use serde::Serialize;

/// Location in the input stream.
///
/// `line` and `column` are 1-indexed. `offset` counts Unicode codepoints
/// consumed since the start of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    /// Position of the first character of a stream.
    pub const START: Self = Self {
        line: 1,
        column: 1,
        offset: 0,
    };

    /// Advance past a single character.
    pub fn advance(&mut self, ch: char) {
        self.offset += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Advance past every character of `text`.
    pub fn advance_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
    }

    /// Position `chars` codepoints further along the same line.
    #[must_use]
    pub fn shifted(self, chars: usize) -> Self {
        Self {
            line: self.line,
            column: self.column + chars,
            offset: self.offset + chars,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}
