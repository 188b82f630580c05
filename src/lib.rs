//! Assembler and single-step emulator for LMinC, a decimal mailbox computer in the style of the
//! Little Man Computer.

// Parsing
mod parser;
pub use parser::AsmParser;
mod air;
pub use air::{Air, AirStmt, Operand};
mod lexer;
mod symbol;
pub use symbol::{Label, Mnemonic, Span, SymbolTable};

mod error;
pub use error::{AsmError, AsmErrorKind};

// Running
mod memory;
pub use memory::{ImageError, MemoryImage, Word, MEMORY_SIZE};
mod instr;
pub use instr::Instruction;
mod runtime;
pub use runtime::{RunError, RunState, Status};
mod output;
pub use output::fault_message;
mod session;
pub use session::{InputSource, Session, SessionOptions};
mod listing;
pub use listing::{listing, used_len};

pub mod env;
pub mod wire;

/// Assembled program: memory image plus what the assembler learned on the way.
#[derive(Clone, Debug)]
pub struct Program {
    pub image: MemoryImage,
    pub symbols: SymbolTable,
    /// Mailboxes taken by source lines, starting at address 0
    pub len: usize,
}

/// Parse, resolve labels and encode in one go. Stops at the first error.
pub fn assemble_program(src: &str) -> Result<Program, AsmError> {
    let air = AsmParser::new(src).parse()?;
    let symbols = air.backpatch()?;
    let image = air.emit(&symbols)?;
    Ok(Program {
        image,
        symbols,
        len: air.len(),
    })
}

/// Assemble `src` into a memory image.
pub fn assemble(src: &str) -> Result<MemoryImage, AsmError> {
    assemble_program(src).map(|program| program.image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_is_deterministic() {
        let src = "start LDA value\n BRZ start\n OUT\n BR start\nvalue DAT 7";
        let first = assemble(src).unwrap();
        let second = assemble(src).unwrap();
        assert_eq!(first, second);
        assert_eq!(&first.words()[..5], &[504, 700, 902, 600, 7]);
    }

    #[test]
    fn undefined_label_is_not_a_parse_error() {
        let err = assemble("LDA x\nBR nowhere\nx DAT").unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::UndefinedLabel("nowhere".into()));
        assert_eq!(err.line, 2);
        assert!(!err.kind.is_parse_error());
    }

    #[test]
    fn earliest_failing_phase_wins() {
        // Parse errors come before resolution errors on earlier lines
        let err = assemble("LDA nowhere\nHLT 1 2").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.kind.is_parse_error());

        // Resolution errors come before encoding errors on earlier lines
        let err = assemble("ADD\nx DAT\nx DAT").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, AsmErrorKind::DuplicateLabel("x".into()));

        let err = assemble("ADD\nx DAT").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, AsmErrorKind::OperandRequired(Mnemonic::Add));
    }

    #[test]
    fn program_reports_symbols_and_len() {
        let program = assemble_program("loop IN\n OUT\n BR loop\nend HLT").unwrap();
        assert_eq!(program.len, 4);
        assert_eq!(program.symbols.get("loop"), Some(0));
        assert_eq!(program.symbols.get("end"), Some(3));
        assert_eq!(program.image, assemble("loop IN\n OUT\n BR loop\nend HLT").unwrap());
    }
}
