//! Flat status codes exchanged with a host that cannot carry Rust enums, such as a WebAssembly
//! page.

use crate::{memory::Word, runtime::RunState, runtime::Status};

/// Returned by [`output_code`] when the machine has no number to give.
pub const NO_OUTPUT: Word = 1000;

impl From<Status> for u32 {
    fn from(status: Status) -> Self {
        match status {
            Status::Running => 0,
            Status::AwaitingNumberInput => 1,
            Status::ProducedNumber => 2,
            Status::Halted => 3,
            Status::EndOfMemory => 4,
            Status::InvalidInstruction => 5,
            Status::AwaitingCharInput => 11,
            Status::ProducedChar => 12,
        }
    }
}

impl TryFrom<u32> for Status {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        let status = match code {
            0 => Status::Running,
            1 => Status::AwaitingNumberInput,
            2 => Status::ProducedNumber,
            3 => Status::Halted,
            4 => Status::EndOfMemory,
            5 => Status::InvalidInstruction,
            11 => Status::AwaitingCharInput,
            12 => Status::ProducedChar,
            other => return Err(other),
        };
        Ok(status)
    }
}

/// Step and report the flat code.
pub fn step_code(state: &mut RunState) -> u32 {
    state.step().into()
}

/// Pending numeric output, or [`NO_OUTPUT`].
pub fn output_code(state: &RunState) -> Word {
    state.output_number().unwrap_or(NO_OUTPUT)
}
