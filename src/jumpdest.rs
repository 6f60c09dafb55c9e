//! Valid-jump-target analysis, extended lazily as targets are queried.
//!
//! A code position is a valid target iff it holds a JUMPDEST byte that is
//! not inside a PUSH immediate. The table length doubles as the scan
//! cursor, so resumption always lands on an opcode boundary and queries
//! agree with a whole-code scan regardless of their order.

use crate::bytecode as op;

#[derive(Debug, Default)]
pub struct JumpTable {
    valid: Vec<bool>,
}

impl JumpTable {
    pub fn new() -> Self {
        Self { valid: Vec::new() }
    }

    /// True iff `target` is a JUMPDEST outside every PUSH immediate.
    /// Targets at or past the end of code are invalid without scanning.
    pub fn is_valid_target(&mut self, code: &[u8], target: u64) -> bool {
        if target >= code.len() as u64 {
            return false;
        }
        let index = target as usize;
        self.scan_to(code, index);
        self.valid.get(index).copied().unwrap_or(false)
    }

    fn scan_to(&mut self, code: &[u8], index: usize) {
        while self.valid.len() <= index {
            let cursor = self.valid.len();
            let opcode = code[cursor];
            if (op::PUSH1..=op::PUSH32).contains(&opcode) {
                // The PUSH byte and its immediate are not targets.
                let skip = 1 + op::push_data_size(opcode);
                self.valid.resize(cursor + skip, false);
            } else {
                self.valid.push(opcode == op::JUMPDEST);
            }
        }
    }

    #[cfg(test)]
    fn scanned_len(&self) -> usize {
        self.valid.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_jumpdest() {
        let code = [op::JUMPDEST, op::STOP, op::JUMPDEST];
        let mut table = JumpTable::new();
        assert!(table.is_valid_target(&code, 0));
        assert!(!table.is_valid_target(&code, 1));
        assert!(table.is_valid_target(&code, 2));
    }

    #[test]
    fn test_jumpdest_inside_push_immediate_is_masked() {
        // PUSH1 0x5B; JUMPDEST
        let code = [op::PUSH1, op::JUMPDEST, op::JUMPDEST];
        let mut table = JumpTable::new();
        assert!(!table.is_valid_target(&code, 1));
        assert!(table.is_valid_target(&code, 2));
    }

    #[test]
    fn test_lazy_resume_stays_on_opcode_boundary() {
        // PUSH2 0x5B 0x5B; JUMPDEST — byte 1 must stay invalid no matter
        // which position is queried first.
        let code = [0x61, op::JUMPDEST, op::JUMPDEST, op::JUMPDEST];
        let mut early_first = JumpTable::new();
        assert!(!early_first.is_valid_target(&code, 1));
        assert!(early_first.is_valid_target(&code, 3));

        let mut late_first = JumpTable::new();
        assert!(late_first.is_valid_target(&code, 3));
        assert!(!late_first.is_valid_target(&code, 1));
        assert!(!late_first.is_valid_target(&code, 2));
    }

    #[test]
    fn test_scan_stops_at_queried_index() {
        let code = [op::JUMPDEST, op::STOP, op::JUMPDEST, op::STOP];
        let mut table = JumpTable::new();
        assert!(table.is_valid_target(&code, 0));
        assert_eq!(table.scanned_len(), 1);
        assert!(table.is_valid_target(&code, 2));
        assert_eq!(table.scanned_len(), 3);
    }

    #[test]
    fn test_target_past_end_of_code() {
        let code = [op::PUSH1, 0x08, op::JUMP];
        let mut table = JumpTable::new();
        assert!(!table.is_valid_target(&code, 8));
        assert!(!table.is_valid_target(&code, u64::MAX));
        assert_eq!(table.scanned_len(), 0);
    }

    #[test]
    fn test_truncated_push_at_end() {
        // PUSH32 with only one immediate byte present.
        let code = [op::PUSH32, op::JUMPDEST];
        let mut table = JumpTable::new();
        assert!(!table.is_valid_target(&code, 1));
    }
}
