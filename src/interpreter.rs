//! Bytecode interpreter — dispatch loop and opcode handlers.
//!
//! One frame is one call to [`interpret`]: a fresh context walks the code
//! byte by byte until a terminal state is reached. Every handler follows
//! the same protocol: probe stack preconditions, charge the static gas
//! cost, pop operands, charge operand-dependent gas, apply the effect and
//! advance the program counter. A handler that fails returns without any
//! further mutation; the loop turns the failure into a sticky terminal
//! state and the frame's remaining gas is zeroed unless it ended `Done`.
//!
//! Host-dependent opcodes (environment, storage, logs, calls, creation,
//! RETURN/REVERT, SELFDESTRUCT) are not part of this core; their bytes
//! fall through to the unknown-opcode branch.

use crate::bytecode as op;
use crate::errors::{RunState, VmError};
use crate::gas::GasMeter;
use crate::jumpdest::JumpTable;
use crate::memory::Memory;
use crate::stack::Stack;
use crate::word;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use tracing::debug;

/// Arguments for one frame.
pub struct ExecArgs<'a> {
    pub code: &'a [u8],
    pub gas: u64,
    /// Call data; carried for the host layer, unread by this core.
    pub input: &'a [u8],
}

/// Outcome of one frame. `remaining_gas` is zero whenever `state` is not
/// [`RunState::Done`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub state: RunState,
    pub remaining_gas: u64,
    pub return_data: Vec<u8>,
}

/// Execute `args.code` until a terminal state.
pub fn interpret(args: &ExecArgs) -> ExecResult {
    let mut ctx = Context::new(args);
    ctx.run();

    let remaining_gas = if ctx.state == RunState::Done {
        ctx.gas.remaining()
    } else {
        0
    };
    debug!(state = %ctx.state, remaining_gas, code_len = args.code.len(), "frame terminated");

    ExecResult { state: ctx.state, remaining_gas, return_data: ctx.return_data }
}

/// Frame-local machine state, exclusively owned for the duration of one
/// frame. Handlers receive it mutably for one instruction at a time.
struct Context<'a> {
    code: &'a [u8],
    pc: usize,
    state: RunState,
    gas: GasMeter,
    stack: Stack,
    memory: Memory,
    jump_table: JumpTable,
    return_data: Vec<u8>,
}

impl<'a> Context<'a> {
    fn new(args: &ExecArgs<'a>) -> Self {
        Self {
            code: args.code,
            pc: 0,
            state: RunState::Running,
            gas: GasMeter::new(args.gas),
            stack: Stack::new(),
            memory: Memory::new(),
            jump_table: JumpTable::new(),
            return_data: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.state == RunState::Running {
            if self.pc >= self.code.len() {
                // Only a terminal handler may leave pc at the end; getting
                // here still Running means execution fell off the code.
                self.state = RunState::ErrorOpcode;
                break;
            }
            if let Err(err) = self.step(self.code[self.pc]) {
                self.state = err.into();
            }
        }
    }

    fn step(&mut self, opcode: u8) -> Result<(), VmError> {
        match opcode {
            op::STOP => {
                self.state = RunState::Done;
            }

            // ── Arithmetic ───────────────────────────────────────────────
            op::ADD => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a.overflowing_add(b).0)?;
                self.pc += 1;
            }
            op::MUL => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a.overflowing_mul(b).0)?;
                self.pc += 1;
            }
            op::SUB => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a.overflowing_sub(b).0)?;
                self.pc += 1;
            }
            op::DIV => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::div(a, b))?;
                self.pc += 1;
            }
            op::SDIV => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::sdiv(a, b))?;
                self.pc += 1;
            }
            op::MOD => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::rem(a, b))?;
                self.pc += 1;
            }
            op::SMOD => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::smod(a, b))?;
                self.pc += 1;
            }
            op::ADDMOD => {
                self.stack.require(3)?;
                self.gas.charge(op::GAS_MID)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulus = self.stack.pop()?;
                self.stack.push(word::addmod(a, b, modulus))?;
                self.pc += 1;
            }
            op::MULMOD => {
                self.stack.require(3)?;
                self.gas.charge(op::GAS_MID)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulus = self.stack.pop()?;
                self.stack.push(word::mulmod(a, b, modulus))?;
                self.pc += 1;
            }
            op::EXP => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_EXP_BASE)?;
                let base = self.stack.pop()?;
                let exponent = self.stack.pop()?;
                self.gas.charge(op::GAS_EXP_BYTE * word::significant_bytes(&exponent))?;
                self.stack.push(word::exp(base, exponent))?;
                self.pc += 1;
            }
            op::SIGNEXTEND => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_LOW)?;
                let index = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(word::signextend(index, value))?;
                self.pc += 1;
            }

            // ── Comparison / bitwise ─────────────────────────────────────
            op::LT => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::from_bool(a < b))?;
                self.pc += 1;
            }
            op::GT => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::from_bool(a > b))?;
                self.pc += 1;
            }
            op::SLT => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::from_bool(word::slt(&a, &b)))?;
                self.pc += 1;
            }
            op::SGT => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::from_bool(word::slt(&b, &a)))?;
                self.pc += 1;
            }
            op::EQ => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(word::from_bool(a == b))?;
                self.pc += 1;
            }
            op::ISZERO => {
                self.stack.require(1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                self.stack.push(word::from_bool(a.is_zero()))?;
                self.pc += 1;
            }
            op::AND => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a & b)?;
                self.pc += 1;
            }
            op::OR => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a | b)?;
                self.pc += 1;
            }
            op::XOR => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a ^ b)?;
                self.pc += 1;
            }
            op::NOT => {
                self.stack.require(1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
                self.pc += 1;
            }
            op::BYTE => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let offset = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(word::byte(offset, value))?;
                self.pc += 1;
            }
            op::SHL => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(word::shl(shift, value))?;
                self.pc += 1;
            }
            op::SHR => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(word::shr(shift, value))?;
                self.pc += 1;
            }
            op::SAR => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(word::sar(shift, value))?;
                self.pc += 1;
            }

            // ── SHA3 ─────────────────────────────────────────────────────
            op::SHA3 => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_SHA3)?;
                let offset = self.stack.pop()?.low_u64();
                let size = self.stack.pop()?.low_u64();
                let words = size.div_ceil(32);
                let end = offset.checked_add(size).unwrap_or(u64::MAX);
                let word_gas = op::GAS_SHA3_WORD.saturating_mul(words);
                self.gas.charge(word_gas.saturating_add(self.memory.expansion_cost(end)))?;
                self.memory.grow_to(end);
                let mut buffer = vec![0u8; size as usize];
                self.memory.write_into(&mut buffer, offset);
                self.stack.push(keccak256(&buffer))?;
                self.pc += 1;
            }

            // ── Stack / memory ───────────────────────────────────────────
            op::POP => {
                self.stack.require(1)?;
                self.gas.charge(op::GAS_BASE)?;
                let _ = self.stack.pop()?;
                self.pc += 1;
            }
            op::MLOAD => {
                self.stack.require(1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let offset = self.stack.pop()?.low_u64();
                self.charge_expansion(offset, 32)?;
                let value = self.memory.load_word(offset);
                self.stack.push(value)?;
                self.pc += 1;
            }
            op::MSTORE => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let offset = self.stack.pop()?.low_u64();
                let value = self.stack.pop()?;
                self.charge_expansion(offset, 32)?;
                self.memory.store_word(offset, value);
                self.pc += 1;
            }
            op::MSTORE8 => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let offset = self.stack.pop()?.low_u64();
                let value = self.stack.pop()?;
                self.charge_expansion(offset, 1)?;
                self.memory.store_byte(offset, value.byte(0));
                self.pc += 1;
            }

            // ── Control flow ─────────────────────────────────────────────
            op::JUMP => {
                self.stack.require(1)?;
                self.gas.charge(op::GAS_JUMP)?;
                let target = self.stack.pop()?.low_u64();
                if !self.jump_table.is_valid_target(self.code, target) {
                    return Err(VmError::InvalidJump(target));
                }
                self.pc = target as usize;
            }
            op::JUMPI => {
                self.stack.require(2)?;
                self.gas.charge(op::GAS_JUMPI)?;
                let target = self.stack.pop()?.low_u64();
                let condition = self.stack.pop()?;
                if condition.is_zero() {
                    self.pc += 1;
                } else {
                    if !self.jump_table.is_valid_target(self.code, target) {
                        return Err(VmError::InvalidJump(target));
                    }
                    self.pc = target as usize;
                }
            }
            op::PC => {
                self.stack.require_room(1)?;
                self.gas.charge(op::GAS_BASE)?;
                self.stack.push(U256::from(self.pc))?;
                self.pc += 1;
            }
            op::MSIZE => {
                self.stack.require_room(1)?;
                self.gas.charge(op::GAS_BASE)?;
                self.stack.push(U256::from(self.memory.size()))?;
                self.pc += 1;
            }
            op::GAS => {
                self.stack.require_room(1)?;
                self.gas.charge(op::GAS_BASE)?;
                // Pushed after the charge for this instruction.
                self.stack.push(U256::from(self.gas.remaining()))?;
                self.pc += 1;
            }
            op::JUMPDEST => {
                self.gas.charge(op::GAS_JUMPDEST)?;
                self.pc += 1;
            }

            // ── PUSH1..PUSH32 ────────────────────────────────────────────
            op::PUSH1..=op::PUSH32 => {
                let width = op::push_data_size(opcode);
                self.stack.require_room(1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let start = self.pc + 1;
                if self.code.len() < start + width {
                    // Truncated immediate: the frame ends here without a
                    // partial push; pc moves past the nominal end.
                    self.pc += 1 + width;
                    self.state = RunState::Done;
                    return Ok(());
                }
                self.stack.push(U256::from_big_endian(&self.code[start..start + width]))?;
                self.pc += 1 + width;
            }

            // ── DUP1..DUP16 ──────────────────────────────────────────────
            op::DUP1..=op::DUP16 => {
                let depth = (opcode - op::DUP1) as usize + 1;
                self.stack.require(depth)?;
                self.stack.require_room(1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                let value = self.stack.peek(depth - 1)?;
                self.stack.push(value)?;
                self.pc += 1;
            }

            // ── SWAP1..SWAP16 ────────────────────────────────────────────
            op::SWAP1..=op::SWAP16 => {
                let depth = (opcode - op::SWAP1) as usize + 1;
                self.stack.require(depth + 1)?;
                self.gas.charge(op::GAS_VERYLOW)?;
                self.stack.swap_top(depth)?;
                self.pc += 1;
            }

            op::INVALID => return Err(VmError::InvalidInstruction),

            other => return Err(VmError::InvalidOpcode(other)),
        }
        Ok(())
    }

    /// Charge the expansion for touching `length` bytes at `offset`. A
    /// range whose end overflows u64 is priced as unpayable.
    fn charge_expansion(&mut self, offset: u64, length: u64) -> Result<(), VmError> {
        let end = offset.checked_add(length).unwrap_or(u64::MAX);
        self.gas.charge(self.memory.expansion_cost(end))
    }
}

fn keccak256(data: &[u8]) -> U256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest: [u8; 32] = hasher.finalize().into();
    U256::from_big_endian(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame<'a>(code: &'a [u8], gas: u64) -> Context<'a> {
        let mut ctx = Context::new(&ExecArgs { code, gas, input: &[] });
        ctx.run();
        ctx
    }

    fn top(ctx: &Context) -> U256 {
        ctx.stack.peek(0).unwrap()
    }

    // ── Arithmetic and bitwise results ────────────────────────────────────

    #[test]
    fn test_add_leaves_sum_on_stack() {
        // PUSH1 5; PUSH1 6; ADD; STOP
        let ctx = run_frame(&[0x60, 5, 0x60, 6, 0x01, 0x00], 100);
        assert_eq!(ctx.state, RunState::Done);
        assert_eq!(ctx.stack.as_slice(), &[U256::from(11)]);
        assert_eq!(ctx.gas.remaining(), 91);
    }

    #[test]
    fn test_sub_is_top_minus_second() {
        // PUSH1 3; PUSH1 10; SUB — pops 10 first.
        let ctx = run_frame(&[0x60, 3, 0x60, 10, 0x03, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(7));
    }

    #[test]
    fn test_div_pops_dividend_first() {
        // PUSH1 3; PUSH1 12; DIV → 12 / 3.
        let ctx = run_frame(&[0x60, 3, 0x60, 12, 0x04, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(4));
    }

    #[test]
    fn test_addmod_operand_order() {
        // PUSH1 8 (modulus); PUSH1 10; PUSH1 10; ADDMOD → (10+10) % 8.
        let ctx = run_frame(&[0x60, 8, 0x60, 10, 0x60, 10, 0x08, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(4));
    }

    #[test]
    fn test_exp_and_dynamic_gas() {
        // PUSH2 0x0100 (exponent); PUSH1 2 (base); EXP → 2^256 truncates to 0.
        let ctx = run_frame(&[0x61, 0x01, 0x00, 0x60, 2, 0x0A, 0x00], 200);
        assert_eq!(ctx.state, RunState::Done);
        assert_eq!(top(&ctx), U256::zero());
        // 3 + 3 + 10 + 50·2 for the two-byte exponent.
        assert_eq!(ctx.gas.remaining(), 200 - 116);
    }

    #[test]
    fn test_exp_zero_exponent_costs_base_only() {
        // PUSH1 0; PUSH1 2; EXP → 1, no per-byte charge.
        let ctx = run_frame(&[0x60, 0, 0x60, 2, 0x0A, 0x00], 100);
        assert_eq!(top(&ctx), U256::one());
        assert_eq!(ctx.gas.remaining(), 100 - 16);
    }

    #[test]
    fn test_signextend_via_opcode() {
        // PUSH1 0xFF; PUSH1 0; SIGNEXTEND → all ones.
        let ctx = run_frame(&[0x60, 0xFF, 0x60, 0, 0x0B, 0x00], 100);
        assert_eq!(top(&ctx), U256::MAX);
    }

    #[test]
    fn test_comparisons() {
        // PUSH1 2; PUSH1 1; LT → 1 < 2.
        let ctx = run_frame(&[0x60, 2, 0x60, 1, 0x10, 0x00], 100);
        assert_eq!(top(&ctx), U256::one());
        // PUSH1 0; PUSH1 0; NOT; SLT → -1 < 0.
        let ctx = run_frame(&[0x60, 0, 0x60, 0, 0x19, 0x12, 0x00], 100);
        assert_eq!(top(&ctx), U256::one());
    }

    #[test]
    fn test_byte_opcode_is_big_endian_indexed() {
        // PUSH2 0xABCD; PUSH1 31; BYTE → 0xCD.
        let ctx = run_frame(&[0x61, 0xAB, 0xCD, 0x60, 31, 0x1A, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(0xCD));
    }

    #[test]
    fn test_sar_sign_fill() {
        // PUSH1 1; NOT (→ -2); PUSH1 1; SAR → -1.
        let ctx = run_frame(&[0x60, 1, 0x19, 0x60, 1, 0x1D, 0x00], 100);
        assert_eq!(top(&ctx), U256::MAX);
    }

    // ── SHA3 ──────────────────────────────────────────────────────────────

    #[test]
    fn test_sha3_of_one_zero_word() {
        // PUSH1 32 (size); PUSH1 0 (offset); SHA3; STOP
        let ctx = run_frame(&[0x60, 32, 0x60, 0, 0x20, 0x00], 200);
        assert_eq!(ctx.state, RunState::Done);
        let expected = U256::from_big_endian(
            &hex::decode("290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563")
                .unwrap(),
        );
        assert_eq!(top(&ctx), expected);
        // 3 + 3 + 30 + 6·1 word + 3 expansion.
        assert_eq!(ctx.gas.remaining(), 200 - 45);
        assert_eq!(ctx.memory.size(), 32);
    }

    #[test]
    fn test_sha3_empty_input() {
        // PUSH1 0; PUSH1 0; SHA3 — hash of the empty string.
        let ctx = run_frame(&[0x60, 0, 0x60, 0, 0x20, 0x00], 100);
        let expected = U256::from_big_endian(
            &hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
                .unwrap(),
        );
        assert_eq!(top(&ctx), expected);
    }

    // ── Memory ────────────────────────────────────────────────────────────

    #[test]
    fn test_mstore_mload_round_trip() {
        // PUSH1 0x2A; PUSH1 0; MSTORE; PUSH1 0; MLOAD; STOP
        let ctx = run_frame(&[0x60, 0x2A, 0x60, 0, 0x52, 0x60, 0, 0x51, 0x00], 100);
        assert_eq!(ctx.state, RunState::Done);
        assert_eq!(top(&ctx), U256::from(0x2A));
        // 3+3 + (3+3 expansion) + 3 + (3+0) — the word is only charged once.
        assert_eq!(ctx.gas.remaining(), 100 - 18);
    }

    #[test]
    fn test_mload_expands_memory() {
        // PUSH1 0; MLOAD; MSIZE; STOP
        let ctx = run_frame(&[0x60, 0, 0x51, 0x59, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(32));
        assert_eq!(ctx.memory.size(), 32);
    }

    #[test]
    fn test_mstore8_touches_one_byte() {
        // PUSH1 0xFF; PUSH1 31; MSTORE8; PUSH1 0; MLOAD; STOP
        let ctx = run_frame(&[0x60, 0xFF, 0x60, 31, 0x53, 0x60, 0, 0x51, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(0xFF));
        assert_eq!(ctx.memory.size(), 32);
    }

    #[test]
    fn test_msize_starts_at_zero() {
        let ctx = run_frame(&[0x59, 0x00], 100);
        assert_eq!(top(&ctx), U256::zero());
    }

    // ── Stack ops ─────────────────────────────────────────────────────────

    #[test]
    fn test_push32_big_endian() {
        let mut code = vec![0x7F];
        code.extend((1..=32).collect::<Vec<u8>>());
        code.push(0x00);
        let ctx = run_frame(&code, 100);
        let mut expected = [0u8; 32];
        expected.copy_from_slice(&(1..=32).collect::<Vec<u8>>());
        assert_eq!(top(&ctx), U256::from_big_endian(&expected));
    }

    #[test]
    fn test_push_with_truncated_immediate_ends_done_without_push() {
        // PUSH4 with only two immediate bytes.
        let ctx = run_frame(&[0x63, 0xAA, 0xBB], 100);
        assert_eq!(ctx.state, RunState::Done);
        assert!(ctx.stack.is_empty());
        assert_eq!(ctx.pc, 5); // past the nominal end
        assert_eq!(ctx.gas.remaining(), 97); // static cost still charged
    }

    #[test]
    fn test_dup_and_swap_depths() {
        // PUSH1 1; PUSH1 2; PUSH1 3; DUP3 → copies the 1.
        let ctx = run_frame(&[0x60, 1, 0x60, 2, 0x60, 3, 0x82, 0x00], 100);
        assert_eq!(top(&ctx), U256::one());
        assert_eq!(ctx.stack.len(), 4);

        // PUSH1 1; PUSH1 2; PUSH1 3; SWAP2 → exchanges 3 and 1.
        let ctx = run_frame(&[0x60, 1, 0x60, 2, 0x60, 3, 0x91, 0x00], 100);
        assert_eq!(ctx.stack.as_slice(), &[U256::from(3), U256::from(2), U256::one()]);
    }

    #[test]
    fn test_pc_pushes_instruction_offset() {
        // PUSH1 0; POP; PC → 3.
        let ctx = run_frame(&[0x60, 0, 0x50, 0x58, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(3));
    }

    #[test]
    fn test_gas_pushes_post_charge_remainder() {
        // GAS; STOP with 100 gas → 98 on the stack.
        let ctx = run_frame(&[0x5A, 0x00], 100);
        assert_eq!(top(&ctx), U256::from(98));
        assert_eq!(ctx.gas.remaining(), 98);
    }

    // ── Control flow ──────────────────────────────────────────────────────

    #[test]
    fn test_jumpi_taken_on_wide_condition() {
        // PUSH32 (1 << 120); PUSH1 37; JUMPI; STOP; JUMPDEST; STOP — the
        // condition is non-zero only above the low 64 bits.
        let mut code = vec![0x7F];
        code.extend([0u8; 32]);
        code[17] = 1;
        code.extend([0x60, 37, 0x57, 0x00, 0x5B, 0x00]);
        let ctx = run_frame(&code, 100);
        assert_eq!(ctx.state, RunState::Done);
        // 3 + 3 + 10 + 1: the JUMPDEST after the jump was executed.
        assert_eq!(ctx.gas.remaining(), 83);
    }

    #[test]
    fn test_jumpi_zero_condition_falls_through() {
        // PUSH1 0; PUSH1 8; JUMPI; STOP — target 8 is out of range but must
        // not be validated when the condition is zero.
        let ctx = run_frame(&[0x60, 0, 0x60, 8, 0x57, 0x00], 100);
        assert_eq!(ctx.state, RunState::Done);
        assert_eq!(ctx.gas.remaining(), 100 - 16);
    }

    #[test]
    fn test_invalid_opcode_is_not_invalid_state() {
        let ctx = run_frame(&[0x5F], 100);
        assert_eq!(ctx.state, RunState::ErrorOpcode);
    }

    #[test]
    fn test_invalid_instruction_state() {
        let ctx = run_frame(&[0xFE], 100);
        assert_eq!(ctx.state, RunState::Invalid);
    }

    // ── Failure atomicity ─────────────────────────────────────────────────

    #[test]
    fn test_stack_probe_fails_before_gas_is_charged() {
        // ADD on an empty stack with plenty of gas: ErrorStack, gas intact.
        let ctx = run_frame(&[0x01], 100);
        assert_eq!(ctx.state, RunState::ErrorStack);
        assert_eq!(ctx.gas.remaining(), 100);
        assert!(ctx.stack.is_empty());
    }

    #[test]
    fn test_static_gas_failure_leaves_stack_intact() {
        // PUSH1 1; PUSH1 2; ADD with gas for the pushes only.
        let ctx = run_frame(&[0x60, 1, 0x60, 2, 0x01], 6);
        assert_eq!(ctx.state, RunState::ErrorGas);
        assert_eq!(ctx.stack.len(), 2);
        assert_eq!(ctx.gas.remaining(), 0);
    }

    #[test]
    fn test_error_state_leaves_pc_in_place() {
        let ctx = run_frame(&[0x60, 1, 0x60, 2, 0x01], 6);
        assert_eq!(ctx.pc, 4); // still at the ADD
    }
}
