//! embervm — a deterministic, gas-metered EVM bytecode interpreter core.
//!
//! The interpreter drives a code slice over a 256-bit word stack and a
//! byte-addressed, lazily expanded memory, charging gas per instruction
//! until the frame reaches a terminal state. Host-dependent opcodes
//! (environment, storage, logs, calls, creation) are outside this core
//! and terminate a frame with an opcode error.

pub mod bytecode;
pub mod cache;
pub mod errors;
pub mod gas;
pub mod interpreter;
pub mod jumpdest;
pub mod memory;
pub mod stack;
pub mod word;

// Process-wide allocator override. Must be enabled at build time; Rust's
// GlobalAlloc routes the aligned and fallible variants through the same
// entry points.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
