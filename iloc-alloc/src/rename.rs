//! Register renaming and next-use analysis
//!
//! First allocator pass. The forward walk assigns virtual registers:
//! within an operation, uses are processed before the definition, so
//! `add r1, r1 => r1` reads the old value's vr and defines a fresh one.
//! The backward walk fills every operand's next-use line, with
//! `NextUse::Never` marking a last use.

use iloc_frontend::{Block, NextUse, Opcode};
use log::{debug, trace};
use std::collections::HashMap;

/// Rename all source registers to virtual registers and compute next-use
/// lines. Returns the total number of virtual registers minted.
pub fn rename(block: &mut Block) -> usize {
    let mut sr_to_vr: HashMap<i32, i32> = HashMap::new();
    let mut next_vr: i32 = 0;

    // Forward pass: assign vrs, uses before the def
    for op in block.iter_mut() {
        for &i in op.use_indices() {
            let sr = op.operands[i].sr;
            if sr < 0 {
                continue;
            }
            let vr = *sr_to_vr.entry(sr).or_insert_with(|| {
                // An upward-exposed use still gets a vr
                let vr = next_vr;
                next_vr += 1;
                trace!("line {}: upward-exposed r{} -> vr{}", op.line, sr, vr);
                vr
            });
            op.operands[i].vr = vr;
        }

        if let Some(d) = op.def_index() {
            let sr = op.operands[d].sr;
            if sr >= 0 {
                let vr = next_vr;
                next_vr += 1;
                sr_to_vr.insert(sr, vr);
                op.operands[d].vr = vr;
            }
        }
    }

    debug!(
        "renamed {} operations onto {} virtual registers",
        block.len(),
        next_vr
    );

    // Backward pass: next-use lines. The def is handled first and kills
    // the live range; a vr is not live above its definition.
    let mut vr_next: HashMap<i32, u32> = HashMap::new();
    for op in block.iter_mut().rev() {
        if let Some(d) = op.def_index() {
            let vr = op.operands[d].vr;
            if vr >= 0 {
                op.operands[d].nu = vr_next
                    .remove(&vr)
                    .map(NextUse::Line)
                    .unwrap_or(NextUse::Never);
            }
        }

        // Read every use's next-use before recording this line, so an
        // operand repeated within the operation sees the use after it,
        // not its own line.
        for &i in op.use_indices() {
            let vr = op.operands[i].vr;
            if vr < 0 {
                continue;
            }
            op.operands[i].nu = vr_next
                .get(&vr)
                .copied()
                .map(NextUse::Line)
                .unwrap_or(NextUse::Never);
        }
        for &i in op.use_indices() {
            let vr = op.operands[i].vr;
            if vr >= 0 {
                vr_next.insert(vr, op.line);
            }
        }
    }

    next_vr as usize
}

/// Render a renamed block as ILOC text over virtual registers
pub fn format_renamed(block: &Block) -> String {
    let mut out = String::new();
    for op in block.iter() {
        let [op1, op2, op3] = &op.operands;
        let text = match op.opcode {
            Opcode::LoadI => format!("loadI {} => r{}", op1.sr, op3.vr),
            Opcode::Load | Opcode::Store => format!("{} r{} => r{}", op.opcode, op1.vr, op3.vr),
            Opcode::Output => format!("output {}", op1.sr),
            Opcode::Nop => "nop".to_string(),
            _ => format!("{} r{}, r{} => r{}", op.opcode, op1.vr, op2.vr, op3.vr),
        };
        out.push_str(&text);
        out.push('\n');
    }
    out
}
