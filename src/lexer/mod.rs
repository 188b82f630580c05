use std::fmt;

use crate::lexer::cursor::Cursor;
use crate::memory::Word;
use crate::symbol::{Span, SrcOffset};

pub mod cursor;

/// A 'light' token that only carries basic and easily derivable info
#[derive(Debug)]
pub struct LToken {
    pub kind: LTokenKind,
    pub len: usize,
}

impl LToken {
    pub fn new(kind: LTokenKind, len: usize) -> Self {
        LToken { kind, len }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LTokenKind {
    /// Any run of characters up to whitespace or a comment
    Word,
    Comment,
    /// Excludes newlines
    Whitespace,
    Newline,
    Eof,
}

/// Token with its text classified, as consumed by the parser.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based line the token starts on
    pub line: usize,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic or label, decided by position
    Ident(String),
    /// Optionally signed decimal literal
    Int(Word),
    /// Word that is neither an identifier nor a literal
    Invalid(String),
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{name}`"),
            TokenKind::Int(val) => write!(f, "literal `{val}`"),
            TokenKind::Invalid(text) => write!(f, "`{text}`"),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

/// Test if a character separates tokens on the same line.
pub(crate) fn is_whitespace(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

pub(crate) fn is_comment_start(c: char) -> bool {
    matches!(c, '#' | ';')
}

/// Test if a character is considered an identifier character.
pub(crate) fn is_id(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn classify(text: &str) -> TokenKind {
    let first = text.chars().next().unwrap_or_default();
    if first.is_ascii_digit() || matches!(first, '-' | '+') {
        // `i64::from_str` accepts a leading sign but nothing else
        return match text.parse::<Word>() {
            Ok(val) => TokenKind::Int(val),
            Err(_) => TokenKind::Invalid(text.to_string()),
        };
    }
    if text.chars().all(is_id) {
        TokenKind::Ident(text.to_string())
    } else {
        TokenKind::Invalid(text.to_string())
    }
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> LToken {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return LToken::new(LTokenKind::Eof, 0),
        };
        let token_kind = match first_char {
            c if is_comment_start(c) => {
                self.take_while(|c| c != '\n');
                LTokenKind::Comment
            }
            '\n' => LTokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                LTokenKind::Whitespace
            }
            _ => {
                self.take_while(|c| !c.is_whitespace() && !is_comment_start(c));
                LTokenKind::Word
            }
        };
        let res = LToken::new(token_kind, self.pos_in_token());
        self.reset_pos();
        res
    }

    /// Next token that is meaningful to the parser. Comments and whitespace are skipped.
    pub fn advance_real(&mut self) -> Token {
        loop {
            let start = self.abs_pos();
            let line = self.line();
            let tok = self.advance_token();
            let span = Span::new(SrcOffset(start), tok.len);
            let kind = match tok.kind {
                LTokenKind::Comment | LTokenKind::Whitespace => continue,
                LTokenKind::Newline => TokenKind::Newline,
                LTokenKind::Eof => TokenKind::Eof,
                LTokenKind::Word => classify(&self.src()[start..start + tok.len]),
            };
            return Token { kind, span, line };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut cur = Cursor::new(src);
        let mut res = Vec::new();
        loop {
            let tok = cur.advance_real();
            if tok.kind == TokenKind::Eof {
                break;
            }
            res.push(tok.kind);
        }
        res
    }

    #[test]
    fn lex_line_with_comment() {
        assert_eq!(
            kinds("loop LDA x # load\n"),
            vec![
                TokenKind::Ident("loop".into()),
                TokenKind::Ident("LDA".into()),
                TokenKind::Ident("x".into()),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn lex_comment_without_space() {
        assert_eq!(
            kinds("OUT;done"),
            vec![TokenKind::Ident("OUT".into())]
        );
    }

    #[test]
    fn lex_literals() {
        assert_eq!(
            kinds("DAT -12 +3 007"),
            vec![
                TokenKind::Ident("DAT".into()),
                TokenKind::Int(-12),
                TokenKind::Int(3),
                TokenKind::Int(7),
            ]
        );
    }

    #[test]
    fn lex_invalid_words() {
        assert_eq!(
            kinds("12ab x,y"),
            vec![
                TokenKind::Invalid("12ab".into()),
                TokenKind::Invalid("x,y".into()),
            ]
        );
    }

    #[test]
    fn lex_tracks_lines_and_spans() {
        let mut cur = Cursor::new("\n\n  HLT");
        assert_eq!(cur.advance_real().kind, TokenKind::Newline);
        assert_eq!(cur.advance_real().kind, TokenKind::Newline);
        let tok = cur.advance_real();
        assert_eq!(tok.line, 3);
        assert_eq!(tok.span.offs(), 4);
        assert_eq!(tok.span.len(), 3);
    }

    #[test]
    fn light_tokens_cover_source() {
        let src = "a  b ; c\nd";
        let mut cur = Cursor::new(src);
        let mut total = 0;
        loop {
            let tok = cur.advance_token();
            if tok.kind == LTokenKind::Eof {
                break;
            }
            total += tok.len;
        }
        assert_eq!(total, src.len());
    }
}
