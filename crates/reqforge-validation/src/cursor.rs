//! Character cursor shared by the style and behavior checkers

/// 1-based source position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pos {
    pub line: usize,
    pub column: usize,
}

pub(crate) struct Cursor {
    input: Vec<char>,
    idx: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            idx: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.idx >= self.input.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.input.get(self.idx).copied()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.input.get(self.idx + n).copied()
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub fn starts_with(&self, needle: &str) -> bool {
        let mut i = self.idx;
        for ch in needle.chars() {
            if self.input.get(i) != Some(&ch) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Consume `needle` if the input continues with it.
    pub fn eat(&mut self, needle: &str) -> bool {
        if !self.starts_with(needle) {
            return false;
        }
        for _ in needle.chars() {
            self.bump();
        }
        true
    }

    /// Advance past the next occurrence of `needle`.
    ///
    /// Returns `false` (with the cursor at end of input) if it never occurs.
    pub fn skip_past(&mut self, needle: &str) -> bool {
        while !self.is_eof() {
            if self.eat(needle) {
                return true;
            }
            self.bump();
        }
        false
    }

    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_track_newlines() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.bump();
        cursor.bump();
        assert_eq!(cursor.pos(), Pos { line: 1, column: 3 });
        cursor.bump();
        assert_eq!(cursor.pos(), Pos { line: 2, column: 1 });
    }

    #[test]
    fn test_skip_past_reports_missing_needle() {
        let mut cursor = Cursor::new("/* open");
        assert!(cursor.eat("/*"));
        assert!(!cursor.skip_past("*/"));
        assert!(cursor.is_eof());
    }
}
