use std::fmt;

use crate::memory::Word;

/// A decoded mailbox word.
///
/// Words `000..=099` are all `HLT`; the operand is ignored. `INA`/`OTA` use the free
/// codes 903/904.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Halt,
    Add(usize),
    Sub(usize),
    Store(usize),
    Load(usize),
    Branch(usize),
    BranchZero(usize),
    BranchPositive(usize),
    Input,
    Output,
    InputChar,
    OutputChar,
}

impl Instruction {
    /// `None` for any word with no matching opcode, including negative and >999 words.
    pub fn decode(word: Word) -> Option<Self> {
        if !(0..=999).contains(&word) {
            return None;
        }
        let opcode = word / 100;
        let addr = (word % 100) as usize;
        let instr = match opcode {
            0 => Instruction::Halt,
            1 => Instruction::Add(addr),
            2 => Instruction::Sub(addr),
            3 => Instruction::Store(addr),
            5 => Instruction::Load(addr),
            6 => Instruction::Branch(addr),
            7 => Instruction::BranchZero(addr),
            8 => Instruction::BranchPositive(addr),
            9 => match addr {
                1 => Instruction::Input,
                2 => Instruction::Output,
                3 => Instruction::InputChar,
                4 => Instruction::OutputChar,
                _ => return None,
            },
            _ => return None,
        };
        Some(instr)
    }

    /// Address operand, for instructions which have one.
    pub fn addr(self) -> Option<usize> {
        match self {
            Instruction::Add(addr)
            | Instruction::Sub(addr)
            | Instruction::Store(addr)
            | Instruction::Load(addr)
            | Instruction::Branch(addr)
            | Instruction::BranchZero(addr)
            | Instruction::BranchPositive(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Instruction::Halt => "HLT",
            Instruction::Add(_) => "ADD",
            Instruction::Sub(_) => "SUB",
            Instruction::Store(_) => "STO",
            Instruction::Load(_) => "LDA",
            Instruction::Branch(_) => "BR",
            Instruction::BranchZero(_) => "BRZ",
            Instruction::BranchPositive(_) => "BRP",
            Instruction::Input => "IN",
            Instruction::Output => "OUT",
            Instruction::InputChar => "INA",
            Instruction::OutputChar => "OTA",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr() {
            Some(addr) => write!(f, "{} {:02}", self.mnemonic(), addr),
            None => f.write_str(self.mnemonic()),
        }
    }
}
