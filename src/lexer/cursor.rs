// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    len_remaining: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
    /// Full source, for slicing tokens back out
    src: &'a str,
    /// 1-based line of the next character
    line: usize,
}

pub(crate) const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            chars: input.chars(),
            src: input,
            line: 1,
        }
    }

    /// Peek the next char without consuming it. Returns [`EOF_CHAR`] at end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Consume next char, keeping the line count current.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Consume chars while predicate holds or until end of input.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Bytes consumed since the last [`Cursor::reset_pos`].
    pub fn pos_in_token(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }

    /// Byte offset of the cursor from the start of the source.
    pub fn abs_pos(&self) -> usize {
        self.src.len() - self.chars.as_str().len()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn src(&self) -> &'a str {
        self.src
    }
}
