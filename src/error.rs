use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::{
    memory::{Word, MEMORY_SIZE},
    symbol::{Mnemonic, Span},
};

/// First failure found while assembling. Assembly stops here and produces no memory image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsmError {
    /// 1-based source line
    pub line: usize,
    pub span: Span,
    pub kind: AsmErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsmErrorKind {
    // Parse errors
    UnknownMnemonic(String),
    MalformedOperand(String),
    InvalidLabel(String),
    UnexpectedToken(String),

    // Resolution errors
    DuplicateLabel(String),
    UndefinedLabel(String),
    AddressOverflow,

    // Encoding errors
    OperandOutOfRange(Word),
    OperandRequired(Mnemonic),
    OperandForbidden(Mnemonic),
}

impl AsmError {
    pub fn new(line: usize, span: Span, kind: AsmErrorKind) -> Self {
        AsmError { line, span, kind }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn kind(&self) -> &AsmErrorKind {
        &self.kind
    }

    /// Attach the source and render as a diagnostic pointing at the offending tokens.
    pub fn into_report(self, name: &str, src: &str) -> Report {
        let (code, help, label) = self.kind.describe();
        miette!(
            severity = Severity::Error,
            code = code,
            help = help,
            labels = vec![LabeledSpan::at(self.span, label)],
            "{} (line {})",
            self.kind,
            self.line,
        )
        .with_source_code(NamedSource::new(name, src.to_string()))
    }
}

impl AsmErrorKind {
    /// Errors raised before any address is assigned.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMnemonic(_)
                | Self::MalformedOperand(_)
                | Self::InvalidLabel(_)
                | Self::UnexpectedToken(_)
        )
    }

    /// Diagnostic code, help text and span label.
    fn describe(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::UnknownMnemonic(_) => (
                "parse::unknown_mnemonic",
                "check the list of available mnemonics in the documentation.",
                "unknown mnemonic",
            ),
            Self::MalformedOperand(_) => (
                "parse::bad_operand",
                "operands are decimal literals like 42 or -3, or label names.",
                "malformed operand",
            ),
            Self::InvalidLabel(_) => (
                "parse::bad_label",
                "labels start with a letter or _ and contain only letters, digits and _.",
                "invalid label",
            ),
            Self::UnexpectedToken(_) => (
                "parse::unexpected_token",
                "lines hold at most a label, a mnemonic and one operand.",
                "unexpected token",
            ),
            Self::DuplicateLabel(_) => (
                "resolve::duplicate_label",
                "labels are only allowed once per file.",
                "duplicate label",
            ),
            Self::UndefinedLabel(_) => (
                "resolve::undefined_label",
                "define the label at the start of a line before using it as an operand.",
                "undefined label",
            ),
            Self::AddressOverflow => (
                "resolve::address_overflow",
                "every instruction and DAT takes one of the 100 mailboxes.",
                "no mailbox left for this line",
            ),
            Self::OperandOutOfRange(_) => (
                "encode::operand_range",
                "address operands must be between 0 and 99.",
                "out-of-range operand",
            ),
            Self::OperandRequired(_) => (
                "encode::operand_required",
                "this mnemonic needs an address or label operand.",
                "missing operand",
            ),
            Self::OperandForbidden(_) => (
                "encode::operand_forbidden",
                "this mnemonic does not take an operand.",
                "unexpected operand",
            ),
        }
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic(name) => write!(f, "Unknown mnemonic `{}`", name),
            Self::MalformedOperand(text) => write!(f, "Malformed operand `{}`", text),
            Self::InvalidLabel(text) => write!(f, "Invalid label `{}`", text),
            Self::UnexpectedToken(text) => write!(f, "Unexpected {}", text),
            Self::DuplicateLabel(name) => write!(f, "Duplicate label `{}`", name),
            Self::UndefinedLabel(name) => write!(f, "Undefined label `{}`", name),
            Self::AddressOverflow => {
                write!(f, "Program does not fit in {} mailboxes", MEMORY_SIZE)
            }
            Self::OperandOutOfRange(val) => {
                write!(f, "Operand {} is not an address between 0 and 99", val)
            }
            Self::OperandRequired(mnemonic) => write!(f, "{} requires an operand", mnemonic),
            Self::OperandForbidden(mnemonic) => {
                write!(f, "{} does not take an operand", mnemonic)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SrcOffset;

    #[test]
    fn message_names_line_and_label() {
        let err = AsmError::new(
            4,
            Span::new(SrcOffset(10), 3),
            AsmErrorKind::UndefinedLabel("top".into()),
        );
        assert_eq!(err.to_string(), "line 4: Undefined label `top`");
        assert!(!err.kind().is_parse_error());
    }

    #[test]
    fn report_carries_code() {
        let err = AsmError::new(
            1,
            Span::new(SrcOffset(0), 4),
            AsmErrorKind::UnknownMnemonic("LDX".into()),
        );
        let report = err.into_report("test.lmc", "LDX 4");
        let code = report.code().map(|code| code.to_string());
        assert_eq!(code.as_deref(), Some("parse::unknown_mnemonic"));
    }
}
