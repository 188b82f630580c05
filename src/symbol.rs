use std::{fmt, str::FromStr};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

use crate::memory::{Word, MEMORY_SIZE};

// Symbol table of label -> memory address
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Labels resolved to the address of the line that defines them.
///
/// Iteration order is definition order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    table: FxMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Add a label. Returns `false` and leaves the table untouched if the label already exists.
    pub fn insert(&mut self, name: &str, addr: usize) -> bool {
        debug_assert!(addr < MEMORY_SIZE);
        if self.table.contains_key(name) {
            return false;
        }
        self.table.insert(name.to_string(), addr);
        true
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.table.get(name).copied()
    }

    /// First label defined for `addr`, if any.
    pub fn label_at(&self, addr: usize) -> Option<&str> {
        self.table
            .iter()
            .find(|(_, &a)| a == addr)
            .map(|(name, _)| name.as_str())
    }
}

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        let start = self.offs().min(other.offs());
        let end = self.end().max(other.end());
        Span::new(SrcOffset(start), end - start)
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SrcOffset(pub usize);

/// Label used to refer to a specific memory address.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Label {
    pub name: String,
    pub span: Span,
}

impl Label {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Label {
            name: name.into(),
            span,
        }
    }

    /// Labels start with a letter or underscore, continue with alphanumerics or underscores, and
    /// must not collide with a mnemonic.
    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        (first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && name.parse::<Mnemonic>().is_err()
    }
}

/// Whether a mnemonic takes an operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arity {
    Required,
    Optional,
    Forbidden,
}

/// Every mnemonic accepted by the assembler, aliases included.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Add,
    Sub,
    Sto,
    Sta,
    Lda,
    Br,
    Bra,
    Brz,
    Brp,
    In,
    Out,
    Ina,
    Ota,
    Hlt,
    Ext,
    Dat,
}

impl Mnemonic {
    pub fn arity(self) -> Arity {
        match self {
            Mnemonic::Add
            | Mnemonic::Sub
            | Mnemonic::Sto
            | Mnemonic::Sta
            | Mnemonic::Lda
            | Mnemonic::Br
            | Mnemonic::Bra
            | Mnemonic::Brz
            | Mnemonic::Brp => Arity::Required,
            Mnemonic::Dat => Arity::Optional,
            Mnemonic::In
            | Mnemonic::Out
            | Mnemonic::Ina
            | Mnemonic::Ota
            | Mnemonic::Hlt
            | Mnemonic::Ext => Arity::Forbidden,
        }
    }

    /// Packed word before the operand is added. `None` for `DAT`, which stores its operand raw.
    pub fn base(self) -> Option<Word> {
        let base = match self {
            Mnemonic::Hlt | Mnemonic::Ext => 0,
            Mnemonic::Add => 100,
            Mnemonic::Sub => 200,
            Mnemonic::Sto | Mnemonic::Sta => 300,
            Mnemonic::Lda => 500,
            Mnemonic::Br | Mnemonic::Bra => 600,
            Mnemonic::Brz => 700,
            Mnemonic::Brp => 800,
            Mnemonic::In => 901,
            Mnemonic::Out => 902,
            Mnemonic::Ina => 903,
            Mnemonic::Ota => 904,
            Mnemonic::Dat => return None,
        };
        Some(base)
    }
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mnemonic = match s.to_ascii_uppercase().as_str() {
            "ADD" => Mnemonic::Add,
            "SUB" => Mnemonic::Sub,
            "STO" => Mnemonic::Sto,
            "STA" => Mnemonic::Sta,
            "LDA" => Mnemonic::Lda,
            "BR" => Mnemonic::Br,
            "BRA" => Mnemonic::Bra,
            "BRZ" => Mnemonic::Brz,
            "BRP" => Mnemonic::Brp,
            "IN" => Mnemonic::In,
            "OUT" => Mnemonic::Out,
            "INA" => Mnemonic::Ina,
            "OTA" => Mnemonic::Ota,
            "HLT" => Mnemonic::Hlt,
            "EXT" => Mnemonic::Ext,
            "DAT" => Mnemonic::Dat,
            _ => return Err(()),
        };
        Ok(mnemonic)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Add => "ADD",
            Mnemonic::Sub => "SUB",
            Mnemonic::Sto => "STO",
            Mnemonic::Sta => "STA",
            Mnemonic::Lda => "LDA",
            Mnemonic::Br => "BR",
            Mnemonic::Bra => "BRA",
            Mnemonic::Brz => "BRZ",
            Mnemonic::Brp => "BRP",
            Mnemonic::In => "IN",
            Mnemonic::Out => "OUT",
            Mnemonic::Ina => "INA",
            Mnemonic::Ota => "OTA",
            Mnemonic::Hlt => "HLT",
            Mnemonic::Ext => "EXT",
            Mnemonic::Dat => "DAT",
        };
        f.write_str(name)
    }
}
