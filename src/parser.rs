use crate::{
    air::{Air, AirStmt, Operand},
    error::{AsmError, AsmErrorKind},
    lexer::{cursor::Cursor, Token, TokenKind},
    symbol::{Label, Mnemonic},
};

/// Transforms source text into AIR, one line at a time.
///
/// Lines are tokenized lazily so that the reported error is always the one on the earliest line.
pub struct AsmParser<'a> {
    cur: Cursor<'a>,
    /// Assembly intermediate representation
    air: Air,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            cur: Cursor::new(src),
            air: Air::new(),
        }
    }

    /// Create AIR out of the source
    pub fn parse(mut self) -> Result<Air, AsmError> {
        loop {
            let (toks, at_eof) = self.next_line();
            if !toks.is_empty() {
                let stmt = Self::parse_line(&toks)?;
                self.air.add_stmt(stmt);
            }
            if at_eof {
                break;
            }
        }
        // Consume self to return AIR
        Ok(self.air)
    }

    /// Tokens up to the next newline, and whether the source is exhausted.
    fn next_line(&mut self) -> (Vec<Token>, bool) {
        let mut toks = Vec::new();
        loop {
            let tok = self.cur.advance_real();
            match tok.kind {
                TokenKind::Newline => return (toks, false),
                TokenKind::Eof => return (toks, true),
                _ => toks.push(tok),
            }
        }
    }

    /// Label and mnemonic are told apart by position: a leading mnemonic means no label, otherwise
    /// the first token is a label and the second must be a mnemonic.
    fn parse_line(toks: &[Token]) -> Result<AirStmt, AsmError> {
        let first = &toks[0];
        let line = first.line;
        let span = first.span.join(toks[toks.len() - 1].span);

        let (label, rest) = if is_mnemonic(first) {
            (None, toks)
        } else {
            match toks.get(1) {
                Some(second) if is_mnemonic(second) => (),
                // `foo bar`: most likely a label followed by a misspelled mnemonic
                Some(Token {
                    kind: TokenKind::Ident(name),
                    span,
                    ..
                }) if matches!(first.kind, TokenKind::Ident(_)) => {
                    return Err(AsmError::new(
                        line,
                        *span,
                        AsmErrorKind::UnknownMnemonic(name.clone()),
                    ))
                }
                _ => return Err(Self::unknown_first(first)),
            }
            let label = match &first.kind {
                TokenKind::Ident(name) if Label::is_valid(name) => Label::new(name, first.span),
                other => {
                    return Err(AsmError::new(
                        line,
                        first.span,
                        AsmErrorKind::InvalidLabel(token_text(other)),
                    ))
                }
            };
            (Some(label), &toks[1..])
        };

        let (mnemonic, mnemonic_span) = match &rest[0].kind {
            TokenKind::Ident(name) => match name.parse::<Mnemonic>() {
                Ok(mnemonic) => (mnemonic, rest[0].span),
                Err(()) => unreachable!("checked to be a mnemonic above"),
            },
            _ => unreachable!("checked to be a mnemonic above"),
        };

        let operand = match rest.get(1) {
            None => None,
            Some(tok) => Some(Self::parse_operand(tok)?),
        };

        if let Some(extra) = rest.get(2) {
            return Err(AsmError::new(
                extra.line,
                extra.span,
                AsmErrorKind::UnexpectedToken(extra.kind.to_string()),
            ));
        }

        Ok(AirStmt {
            label,
            mnemonic,
            mnemonic_span,
            operand,
            line,
            span,
        })
    }

    fn parse_operand(tok: &Token) -> Result<Operand, AsmError> {
        match &tok.kind {
            TokenKind::Int(val) => Ok(Operand::Lit(*val, tok.span)),
            TokenKind::Ident(name) if Label::is_valid(name) => {
                Ok(Operand::Label(Label::new(name, tok.span)))
            }
            other => Err(AsmError::new(
                tok.line,
                tok.span,
                AsmErrorKind::MalformedOperand(token_text(other)),
            )),
        }
    }

    /// Error for a line whose first token is neither a mnemonic nor a label followed by one.
    fn unknown_first(tok: &Token) -> AsmError {
        let kind = match &tok.kind {
            TokenKind::Ident(name) => AsmErrorKind::UnknownMnemonic(name.clone()),
            TokenKind::Invalid(text) => AsmErrorKind::UnknownMnemonic(text.clone()),
            other => AsmErrorKind::UnexpectedToken(other.to_string()),
        };
        AsmError::new(tok.line, tok.span, kind)
    }
}

fn is_mnemonic(tok: &Token) -> bool {
    matches!(&tok.kind, TokenKind::Ident(name) if name.parse::<Mnemonic>().is_ok())
}

/// Raw source text of a word token.
fn token_text(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(text) | TokenKind::Invalid(text) => text.clone(),
        TokenKind::Int(val) => val.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(src: &str) -> AsmError {
        AsmParser::new(src).parse().unwrap_err()
    }

    #[test]
    fn parse_blank_and_comments() {
        let air = AsmParser::new("\n   # nothing\n; here either\n\n").parse().unwrap();
        assert!(air.is_empty());
    }

    #[test]
    fn parse_mnemonic_only() {
        let air = AsmParser::new("hlt").parse().unwrap();
        let stmt = air.get(0);
        assert_eq!(stmt.label, None);
        assert_eq!(stmt.mnemonic, Mnemonic::Hlt);
        assert_eq!(stmt.operand, None);
        assert_eq!(stmt.line, 1);
    }

    #[test]
    fn parse_label_mnemonic_operand() {
        let air = AsmParser::new("\n\nloop  LDA count  # load it\n").parse().unwrap();
        let stmt = air.get(0);
        assert_eq!(stmt.line, 3);
        assert_eq!(stmt.label.as_ref().map(|l| l.name.as_str()), Some("loop"));
        assert_eq!(stmt.mnemonic, Mnemonic::Lda);
        assert!(matches!(&stmt.operand, Some(Operand::Label(l)) if l.name == "count"));
    }

    #[test]
    fn parse_literal_operand() {
        let air = AsmParser::new("x DAT -5").parse().unwrap();
        assert!(matches!(air.get(0).operand, Some(Operand::Lit(-5, _))));
    }

    #[test]
    fn parse_unknown_mnemonic() {
        let err = parse_err("HLT\nLDX 5");
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, AsmErrorKind::UnknownMnemonic("LDX".into()));

        let err = parse_err("start JUMP end");
        assert_eq!(err.kind, AsmErrorKind::UnknownMnemonic("JUMP".into()));

        let err = parse_err("lonely");
        assert_eq!(err.kind, AsmErrorKind::UnknownMnemonic("lonely".into()));
    }

    #[test]
    fn parse_malformed_operand() {
        let err = parse_err("LDA 12ab");
        assert_eq!(err.kind, AsmErrorKind::MalformedOperand("12ab".into()));

        let err = parse_err("BR OUT");
        assert_eq!(err.kind, AsmErrorKind::MalformedOperand("OUT".into()));
    }

    #[test]
    fn parse_stray_punctuation() {
        let err = parse_err("loop: HLT");
        assert_eq!(err.kind, AsmErrorKind::InvalidLabel("loop:".into()));

        let err = parse_err("ADD x,");
        assert_eq!(err.kind, AsmErrorKind::MalformedOperand("x,".into()));
    }

    #[test]
    fn parse_too_many_tokens() {
        let err = parse_err("a ADD b c");
        assert_eq!(err.kind, AsmErrorKind::UnexpectedToken("identifier `c`".into()));
    }

    #[test]
    fn parse_reports_first_error_line() {
        let err = parse_err("HLT\nfoo bar baz\nLDA 1x");
        assert_eq!(err.line, 2);
        assert!(err.kind.is_parse_error());
    }
}
