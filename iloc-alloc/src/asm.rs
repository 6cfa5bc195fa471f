//! Rewritten ILOC instruction stream
//!
//! The allocator accumulates typed instructions and the driver prints
//! them; the printed stream is identical to emitting during allocation.

use iloc_frontend::Opcode;
use std::fmt;
use std::io;

/// One emitted ILOC instruction over physical registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmOp {
    /// `loadI <imm> => r<dst>`
    LoadI(i32, u32),
    /// `load r<addr> => r<dst>`
    Load(u32, u32),
    /// `store r<src> => r<addr>`
    Store(u32, u32),
    /// `<op> r<a>, r<b> => r<dst>`
    Arith(Opcode, u32, u32, u32),
    /// `output <imm>`
    Output(i32),
    Nop,
}

impl fmt::Display for AsmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmOp::LoadI(imm, dst) => write!(f, "loadI {} => r{}", imm, dst),
            AsmOp::Load(addr, dst) => write!(f, "load r{} => r{}", addr, dst),
            AsmOp::Store(src, addr) => write!(f, "store r{} => r{}", src, addr),
            AsmOp::Arith(op, a, b, dst) => write!(f, "{} r{}, r{} => r{}", op, a, b, dst),
            AsmOp::Output(imm) => write!(f, "output {}", imm),
            AsmOp::Nop => write!(f, "nop"),
        }
    }
}

/// Write an instruction stream, one per line
pub fn write_ops<W: io::Write>(w: &mut W, ops: &[AsmOp]) -> io::Result<()> {
    for op in ops {
        writeln!(w, "{}", op)?;
    }
    Ok(())
}
