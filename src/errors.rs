use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure detected by an opcode handler. Converted into the terminal
/// [`RunState`] by the dispatch loop; never recovered within a frame.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination: {0}")]
    InvalidJump(u64),
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
    #[error("designated invalid instruction")]
    InvalidInstruction,
    #[error("execution ran past the end of code")]
    CodeOverrun,
}

/// Execution status of a frame. `Running` only ever appears while the
/// dispatch loop is live; every other variant is terminal and sticky.
/// `ErrorCall` and `ErrorCreate` are reserved for a host layer and are
/// never produced by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Done,
    Invalid,
    ErrorOpcode,
    ErrorGas,
    ErrorStack,
    ErrorJump,
    ErrorCall,
    ErrorCreate,
}

impl RunState {
    /// True for every state except `Done` and `Running`.
    pub fn is_error(&self) -> bool {
        !matches!(self, RunState::Running | RunState::Done)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Running => "Running",
            RunState::Done => "Done",
            RunState::Invalid => "Invalid",
            RunState::ErrorOpcode => "ErrorOpcode",
            RunState::ErrorGas => "ErrorGas",
            RunState::ErrorStack => "ErrorStack",
            RunState::ErrorJump => "ErrorJump",
            RunState::ErrorCall => "ErrorCall",
            RunState::ErrorCreate => "ErrorCreate",
        };
        f.write_str(name)
    }
}

impl From<VmError> for RunState {
    fn from(err: VmError) -> Self {
        match err {
            VmError::OutOfGas => RunState::ErrorGas,
            VmError::StackUnderflow | VmError::StackOverflow => RunState::ErrorStack,
            VmError::InvalidJump(_) => RunState::ErrorJump,
            VmError::InvalidOpcode(_) | VmError::CodeOverrun => RunState::ErrorOpcode,
            VmError::InvalidInstruction => RunState::Invalid,
        }
    }
}
