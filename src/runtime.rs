use std::{error::Error, fmt};

use crate::{
    instr::Instruction,
    memory::{MemoryImage, Word, MEMORY_SIZE},
};

/// Outcome of a single [`RunState::step`], and the machine status between steps.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    /// Keep stepping.
    Running,
    /// `IN` is waiting for [`RunState::input_number`].
    AwaitingNumberInput,
    /// `INA` is waiting for [`RunState::input_char`].
    AwaitingCharInput,
    /// `OUT` executed; read with [`RunState::output_number`].
    ProducedNumber,
    /// `OTA` executed; read with [`RunState::output_char`].
    ProducedChar,
    /// `HLT` executed. Normal end of program.
    Halted,
    /// Program counter left the mailboxes.
    EndOfMemory,
    /// Word at the program counter has no matching opcode.
    InvalidInstruction,
}

impl Status {
    /// No further step changes the machine; re-initialise to run again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Halted | Status::EndOfMemory | Status::InvalidInstruction
        )
    }

    /// Terminal because the program went wrong.
    pub fn is_fault(self) -> bool {
        matches!(self, Status::EndOfMemory | Status::InvalidInstruction)
    }

    pub fn is_awaiting_input(self) -> bool {
        matches!(self, Status::AwaitingNumberInput | Status::AwaitingCharInput)
    }
}

/// Misuse of the input protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunError {
    /// Input given while the machine was not waiting for that kind of input.
    NotAwaitingInput { status: Status },
}

impl Error for RunError {}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAwaitingInput { status } => {
                write!(f, "Machine is not expecting this input (status: {:?})", status)
            }
        }
    }
}

/// Represents complete machine state during runtime.
#[derive(Clone, Debug)]
pub struct RunState {
    /// The 100 mailboxes
    mem: MemoryImage,
    /// Program counter. May point past the last mailbox after falling through.
    pc: usize,
    /// Accumulator
    acc: Word,
    status: Status,
    /// Last value produced by `OUT`/`OTA` or consumed by `IN`/`INA`
    io: Word,
}

impl RunState {
    /// Fresh machine over `image`: accumulator and program counter zeroed, status `Running`.
    pub fn new(image: MemoryImage) -> Self {
        RunState {
            mem: image,
            pc: 0,
            acc: 0,
            status: Status::Running,
            io: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn acc(&self) -> Word {
        self.acc
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.mem
    }

    /// Execute exactly one instruction and return the new status.
    ///
    /// Terminal machines and machines still waiting for input are left untouched and report their
    /// current status again.
    pub fn step(&mut self) -> Status {
        if self.status.is_terminal() || self.status.is_awaiting_input() {
            return self.status;
        }
        self.status = self.execute();
        self.status
    }

    fn execute(&mut self) -> Status {
        if self.pc >= MEMORY_SIZE {
            return Status::EndOfMemory;
        }
        let Some(instr) = Instruction::decode(self.mem[self.pc]) else {
            return Status::InvalidInstruction;
        };

        match instr {
            Instruction::Halt => return Status::Halted,
            // Input instructions stay on the program counter until the value arrives
            Instruction::Input => return Status::AwaitingNumberInput,
            Instruction::InputChar => return Status::AwaitingCharInput,
            _ => (),
        }

        // PC incremented before instruction is performed
        self.pc += 1;
        match instr {
            Instruction::Add(addr) => {
                self.acc = self.acc.saturating_add(self.mem[addr]);
            }
            Instruction::Sub(addr) => {
                self.acc = self.acc.saturating_sub(self.mem[addr]);
            }
            Instruction::Store(addr) => {
                self.mem[addr] = self.acc;
            }
            Instruction::Load(addr) => {
                self.acc = self.mem[addr];
            }
            Instruction::Branch(addr) => {
                self.pc = addr;
            }
            Instruction::BranchZero(addr) => {
                if self.acc == 0 {
                    self.pc = addr;
                }
            }
            Instruction::BranchPositive(addr) => {
                if self.acc >= 0 {
                    self.pc = addr;
                }
            }
            Instruction::Output => {
                self.io = self.acc;
                return Status::ProducedNumber;
            }
            Instruction::OutputChar => {
                self.io = self.acc;
                return Status::ProducedChar;
            }
            Instruction::Halt | Instruction::Input | Instruction::InputChar => {
                unreachable!("handled before incrementing PC")
            }
        }
        Status::Running
    }

    /// Complete a pending `IN` with `value`.
    pub fn input_number(&mut self, value: Word) -> Result<(), RunError> {
        self.complete_input(Status::AwaitingNumberInput, value)
    }

    /// Complete a pending `INA` with a character code.
    pub fn input_char(&mut self, code: u32) -> Result<(), RunError> {
        self.complete_input(Status::AwaitingCharInput, Word::from(code))
    }

    fn complete_input(&mut self, expected: Status, value: Word) -> Result<(), RunError> {
        if self.status != expected {
            return Err(RunError::NotAwaitingInput {
                status: self.status,
            });
        }
        self.acc = value;
        self.io = value;
        self.pc += 1;
        self.status = Status::Running;
        Ok(())
    }

    /// Value of the `OUT` that just executed. `None` unless the last step produced a number.
    pub fn output_number(&self) -> Option<Word> {
        (self.status == Status::ProducedNumber).then_some(self.io)
    }

    /// Character code of the `OTA` that just executed. `None` unless the last step produced a
    /// character, or if the accumulator held a negative or oversized value.
    pub fn output_char(&self) -> Option<u32> {
        if self.status != Status::ProducedChar {
            return None;
        }
        u32::try_from(self.io).ok()
    }

    /// Last value which passed through `IN`, `INA`, `OUT` or `OTA`.
    pub fn last_io(&self) -> Word {
        self.io
    }
}
