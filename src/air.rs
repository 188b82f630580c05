use crate::{
    error::{AsmError, AsmErrorKind},
    memory::{MemoryImage, Word, MEMORY_SIZE},
    symbol::{Arity, Label, Mnemonic, Span, SymbolTable},
};

/// Assembly intermediate representation: one statement per mailbox, in source order.
#[derive(Debug, Default)]
pub struct Air {
    ast: Vec<AirStmt>,
}

impl Air {
    pub fn new() -> Self {
        Air { ast: Vec::new() }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.ast.push(stmt)
    }

    pub fn get(&self, idx: usize) -> &AirStmt {
        &self.ast[idx]
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    /// Assign each statement the next address and collect labels, then check every label operand
    /// against the finished table.
    pub fn backpatch(&self) -> Result<SymbolTable, AsmError> {
        let mut symbols = SymbolTable::new();
        for (addr, stmt) in self.ast.iter().enumerate() {
            if addr >= MEMORY_SIZE {
                return Err(AsmError::new(
                    stmt.line,
                    stmt.span,
                    AsmErrorKind::AddressOverflow,
                ));
            }
            if let Some(label) = &stmt.label {
                if !symbols.insert(&label.name, addr) {
                    return Err(AsmError::new(
                        stmt.line,
                        label.span,
                        AsmErrorKind::DuplicateLabel(label.name.clone()),
                    ));
                }
            }
        }

        for stmt in &self.ast {
            if let Some(Operand::Label(label)) = &stmt.operand {
                if symbols.get(&label.name).is_none() {
                    return Err(stmt.undefined(label));
                }
            }
        }
        Ok(symbols)
    }

    /// Encode every statement. Trailing mailboxes stay zero.
    pub fn emit(&self, symbols: &SymbolTable) -> Result<MemoryImage, AsmError> {
        let mut image = MemoryImage::new();
        for (addr, stmt) in self.ast.iter().enumerate() {
            if addr >= MEMORY_SIZE {
                return Err(AsmError::new(
                    stmt.line,
                    stmt.span,
                    AsmErrorKind::AddressOverflow,
                ));
            }
            image[addr] = stmt.emit(symbols)?;
        }
        Ok(image)
    }
}

/// Single source line. Has an optional label.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub label: Option<Label>,
    pub mnemonic: Mnemonic,
    pub mnemonic_span: Span,
    pub operand: Option<Operand>,
    /// 1-based source line
    pub line: usize,
    /// Whole statement, label to operand
    pub span: Span,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Lit(Word, Span),
    Label(Label),
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Lit(_, span) => *span,
            Operand::Label(label) => label.span,
        }
    }
}

impl AirStmt {
    /// Packed word for this statement.
    pub fn emit(&self, symbols: &SymbolTable) -> Result<Word, AsmError> {
        let operand = match &self.operand {
            None => None,
            Some(Operand::Lit(val, _)) => Some(*val),
            Some(Operand::Label(label)) => match symbols.get(&label.name) {
                Some(addr) => Some(addr as Word),
                None => return Err(self.undefined(label)),
            },
        };

        match (self.mnemonic.arity(), &self.operand) {
            (Arity::Required, None) => {
                return Err(self.error(
                    self.mnemonic_span,
                    AsmErrorKind::OperandRequired(self.mnemonic),
                ))
            }
            (Arity::Forbidden, Some(op)) => {
                return Err(self.error(op.span(), AsmErrorKind::OperandForbidden(self.mnemonic)))
            }
            _ => (),
        }

        let Some(base) = self.mnemonic.base() else {
            // `DAT` stores its value verbatim
            return Ok(operand.unwrap_or(0));
        };
        match operand {
            None => Ok(base),
            Some(addr) if (0..MEMORY_SIZE as Word).contains(&addr) => Ok(base + addr),
            Some(val) => {
                let span = self.operand.as_ref().map_or(self.span, Operand::span);
                Err(self.error(span, AsmErrorKind::OperandOutOfRange(val)))
            }
        }
    }

    fn error(&self, span: Span, kind: AsmErrorKind) -> AsmError {
        AsmError::new(self.line, span, kind)
    }

    fn undefined(&self, label: &Label) -> AsmError {
        self.error(label.span, AsmErrorKind::UndefinedLabel(label.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AsmParser;

    fn parse(src: &str) -> Air {
        AsmParser::new(src).parse().unwrap()
    }

    #[test]
    fn backpatch_assigns_source_order() {
        let air = parse("
        start LDA x
              BRZ end
        x     DAT 3
        end   HLT
        ");
        let symbols = air.backpatch().unwrap();
        assert_eq!(symbols.get("start"), Some(0));
        assert_eq!(symbols.get("x"), Some(2));
        assert_eq!(symbols.get("end"), Some(3));
    }

    #[test]
    fn backpatch_duplicate_label() {
        let err = parse("a HLT\nb HLT\na DAT").backpatch().unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, AsmErrorKind::DuplicateLabel("a".into()));
    }

    #[test]
    fn backpatch_undefined_label() {
        let err = parse("LDA x\nBR nowhere\nx DAT").backpatch().unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, AsmErrorKind::UndefinedLabel("nowhere".into()));
    }

    #[test]
    fn backpatch_labels_are_case_sensitive() {
        let err = parse("LDA X\nx DAT").backpatch().unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::UndefinedLabel("X".into()));
    }

    #[test]
    fn backpatch_overflow() {
        let src = "DAT\n".repeat(MEMORY_SIZE) + "HLT\n";
        let err = parse(&src).backpatch().unwrap_err();
        assert_eq!(err.line, MEMORY_SIZE + 1);
        assert_eq!(err.kind, AsmErrorKind::AddressOverflow);

        let src = "DAT\n".repeat(MEMORY_SIZE);
        assert!(parse(&src).backpatch().is_ok());
    }

    #[test]
    fn emit_packs_words() {
        let air = parse("
            IN
            STO 99
            STA 12
            ADD 5
            SUB 6
            LDA 7
            BR 8
            BRA 9
            BRZ 10
            BRP 11
            OUT
            INA
            OTA
            HLT
            EXT
            DAT
            DAT -42
            DAT 1234
        ");
        let symbols = air.backpatch().unwrap();
        let image = air.emit(&symbols).unwrap();
        assert_eq!(
            &image.words()[..19],
            &[
                901, 399, 312, 105, 206, 507, 608, 609, 710, 811, 902, 903, 904, 0, 0, 0, -42,
                1234, 0
            ]
        );
    }

    #[test]
    fn emit_dat_label_stores_address() {
        let air = parse("base_a DAT base\nbase DAT 0");
        let symbols = air.backpatch().unwrap();
        assert_eq!(air.emit(&symbols).unwrap()[0], 1);
    }

    #[test]
    fn emit_operand_out_of_range() {
        let air = parse("BR 100");
        let symbols = air.backpatch().unwrap();
        let err = air.emit(&symbols).unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::OperandOutOfRange(100));

        let air = parse("LDA -1");
        let err = air.emit(&air.backpatch().unwrap()).unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::OperandOutOfRange(-1));
    }

    #[test]
    fn emit_arity_mismatch() {
        let air = parse("HLT\nADD");
        let err = air.emit(&air.backpatch().unwrap()).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, AsmErrorKind::OperandRequired(Mnemonic::Add));

        let air = parse("OUT 5");
        let err = air.emit(&air.backpatch().unwrap()).unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::OperandForbidden(Mnemonic::Out));
    }
}
