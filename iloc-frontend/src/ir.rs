//! Intermediate representation for ILOC blocks
//!
//! Each operation carries four register slots per operand position:
//! the source register as written (`sr`), the virtual register assigned
//! by renaming (`vr`), the physical register assigned by allocation
//! (`pr`), and the next-use line (`nu`). A slot value of `-1` means the
//! position is absent. For `loadI` and `output`, position 1's `sr`
//! holds the immediate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The ILOC opcodes accepted by this allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    LoadI,
    Load,
    Store,
    Add,
    Sub,
    Mult,
    Lshift,
    Rshift,
    Output,
    Nop,
}

impl Opcode {
    /// Surface keyword for this opcode
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::LoadI => "loadI",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mult => "mult",
            Opcode::Lshift => "lshift",
            Opcode::Rshift => "rshift",
            Opcode::Output => "output",
            Opcode::Nop => "nop",
        }
    }

    /// Look up an opcode by its surface keyword
    pub fn from_mnemonic(word: &str) -> Option<Opcode> {
        match word {
            "loadI" => Some(Opcode::LoadI),
            "load" => Some(Opcode::Load),
            "store" => Some(Opcode::Store),
            "add" => Some(Opcode::Add),
            "sub" => Some(Opcode::Sub),
            "mult" => Some(Opcode::Mult),
            "lshift" => Some(Opcode::Lshift),
            "rshift" => Some(Opcode::Rshift),
            "output" => Some(Opcode::Output),
            "nop" => Some(Opcode::Nop),
            _ => None,
        }
    }

    pub fn is_arith(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::Lshift | Opcode::Rshift
        )
    }

    /// Does this opcode define a register (position 3)?
    ///
    /// `store` does not: its third operand is a use (the address).
    pub fn has_def(&self) -> bool {
        matches!(self, Opcode::LoadI | Opcode::Load) || self.is_arith()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Next-use marker for an operand occurrence
///
/// `Never` means no further use; it compares greater than every line so
/// the furthest-next-use eviction can order occupants directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NextUse {
    Line(u32),
    Never,
}

impl fmt::Display for NextUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextUse::Line(line) => write!(f, "{}", line),
            NextUse::Never => write!(f, "inf"),
        }
    }
}

/// One operand position of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub sr: i32,
    pub vr: i32,
    pub pr: i32,
    pub nu: NextUse,
}

impl Operand {
    pub fn absent() -> Self {
        Self {
            sr: -1,
            vr: -1,
            pr: -1,
            nu: NextUse::Never,
        }
    }

    pub fn with_sr(sr: i32) -> Self {
        Self {
            sr,
            ..Self::absent()
        }
    }
}

impl Default for Operand {
    fn default() -> Self {
        Self::absent()
    }
}

/// A single ILOC operation on a specific source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub line: u32,
    pub opcode: Opcode,
    pub operands: [Operand; 3],
}

impl Operation {
    pub fn new(line: u32, opcode: Opcode) -> Self {
        Self {
            line,
            opcode,
            operands: [Operand::absent(); 3],
        }
    }

    /// Operand positions that are register uses, in position order.
    ///
    /// `store` reads both its operands; position 3 is the address, not a
    /// definition.
    pub fn use_indices(&self) -> &'static [usize] {
        match self.opcode {
            Opcode::Load => &[0],
            Opcode::Store => &[0, 2],
            op if op.is_arith() => &[0, 1],
            _ => &[],
        }
    }

    /// The operand position defined by this operation, if any
    pub fn def_index(&self) -> Option<usize> {
        if self.opcode.has_def() {
            Some(2)
        } else {
            None
        }
    }
}

impl fmt::Display for Operation {
    /// Human-readable IR table row, one operation per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [op1, op2, op3] = &self.operands;
        match self.opcode {
            Opcode::LoadI => write!(
                f,
                "[ {:<8} | val: {:6} |        -       | r{:6} | ]",
                self.opcode, op1.sr, op3.sr
            ),
            Opcode::Load | Opcode::Store => write!(
                f,
                "[ {:<8} | r{:6} |        -       | r{:6} | ]",
                self.opcode, op1.sr, op3.sr
            ),
            op if op.is_arith() => write!(
                f,
                "[ {:<8} | r{:6} | r{:6} | r{:6} | ]",
                self.opcode, op1.sr, op2.sr, op3.sr
            ),
            Opcode::Output => write!(
                f,
                "[ {:<8} | val: {:6} |        -       |        -       | ]",
                self.opcode, op1.sr
            ),
            _ => write!(
                f,
                "[ {:<8} |        -       |        -       |        -       | ]",
                self.opcode
            ),
        }
    }
}

/// An ordered, append-only block of operations.
///
/// Stored contiguously; the renamer's backward pass iterates in reverse
/// rather than chasing prev links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    ops: Vec<Operation>,
}

impl Block {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Operation> {
        self.ops.iter_mut()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "{}", op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_use_def_positions() {
        let load = Operation::new(1, Opcode::Load);
        assert_eq!(load.use_indices(), &[0]);
        assert_eq!(load.def_index(), Some(2));

        let store = Operation::new(2, Opcode::Store);
        assert_eq!(store.use_indices(), &[0, 2]);
        assert_eq!(store.def_index(), None);

        let add = Operation::new(3, Opcode::Add);
        assert_eq!(add.use_indices(), &[0, 1]);
        assert_eq!(add.def_index(), Some(2));

        let loadi = Operation::new(4, Opcode::LoadI);
        assert!(loadi.use_indices().is_empty());
        assert_eq!(loadi.def_index(), Some(2));

        let output = Operation::new(5, Opcode::Output);
        assert!(output.use_indices().is_empty());
        assert_eq!(output.def_index(), None);
    }

    #[test]
    fn test_next_use_ordering() {
        assert!(NextUse::Never > NextUse::Line(u32::MAX));
        assert!(NextUse::Line(5) > NextUse::Line(4));
        assert_eq!(NextUse::Never, NextUse::Never);
        assert_eq!(format!("{}", NextUse::Line(12)), "12");
        assert_eq!(format!("{}", NextUse::Never), "inf");
    }

    #[test]
    fn test_operation_table_row() {
        let mut op = Operation::new(1, Opcode::LoadI);
        op.operands[0] = Operand::with_sr(1024);
        op.operands[2] = Operand::with_sr(0);
        assert_eq!(
            format!("{}", op),
            "[ loadI    | val:   1024 |        -       | r     0 | ]"
        );

        let mut add = Operation::new(2, Opcode::Add);
        add.operands[0] = Operand::with_sr(0);
        add.operands[1] = Operand::with_sr(1);
        add.operands[2] = Operand::with_sr(2);
        assert_eq!(
            format!("{}", add),
            "[ add      | r     0 | r     1 | r     2 | ]"
        );

        let nop = Operation::new(3, Opcode::Nop);
        assert_eq!(
            format!("{}", nop),
            "[ nop      |        -       |        -       |        -       | ]"
        );
    }

    #[test]
    fn test_mnemonic_round_trip() {
        for op in [
            Opcode::LoadI,
            Opcode::Load,
            Opcode::Store,
            Opcode::Add,
            Opcode::Sub,
            Opcode::Mult,
            Opcode::Lshift,
            Opcode::Rshift,
            Opcode::Output,
            Opcode::Nop,
        ] {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("loadi"), None);
        assert_eq!(Opcode::from_mnemonic("jump"), None);
    }
}
