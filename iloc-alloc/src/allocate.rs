//! Bottom-up local register allocation
//!
//! Second allocator pass. Walks the renamed block in source order,
//! keeping a register file of `k - 1` physical registers; the highest
//! register `r(k-1)` is reserved as scratch for spill addresses. Values
//! defined by `loadI` are deferred and rematerialized at first use
//! instead of being spilled. Eviction picks the occupant with the
//! furthest next use, breaking ties toward the lowest register index so
//! output is deterministic.

use crate::asm::AsmOp;
use iloc_frontend::{Block, NextUse, Opcode};
use log::{debug, trace};

/// First spill address; each new slot advances by `SPILL_STEP`
const SPILL_BASE: i32 = 32768;
const SPILL_STEP: i32 = 4;

struct Allocator {
    /// Scratch register index (`k - 1`), never bound to a vr
    scratch: u32,
    /// Occupant of each allocatable physical register
    pr_to_vr: Vec<Option<i32>>,
    vr_to_pr: Vec<Option<u32>>,
    /// Best-known next-use line per live vr
    vr_nu: Vec<NextUse>,
    /// Spill address per vr, once assigned it is permanent
    vr_spill_addr: Vec<Option<i32>>,
    /// Constant value per vr still rematerializable from its `loadI`
    vr_const: Vec<Option<i32>>,
    next_spill: i32,
    /// Physical registers holding operands of the current operation;
    /// these must not be evicted while the operation's uses materialize
    pinned: Vec<u32>,
    out: Vec<AsmOp>,
}

impl Allocator {
    fn new(k: u32, vr_count: usize) -> Self {
        Self {
            scratch: k - 1,
            pr_to_vr: vec![None; (k - 1) as usize],
            vr_to_pr: vec![None; vr_count],
            vr_nu: vec![NextUse::Never; vr_count],
            vr_spill_addr: vec![None; vr_count],
            vr_const: vec![None; vr_count],
            next_spill: SPILL_BASE,
            pinned: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Pick a physical register: the lowest-indexed free one, else the
    /// occupant with the furthest next use (ties to the lowest index).
    /// Pinned registers are never candidates for eviction.
    fn select_pr(&self) -> u32 {
        for (pr, occupant) in self.pr_to_vr.iter().enumerate() {
            if occupant.is_none() {
                return pr as u32;
            }
        }

        let mut best_pr = None;
        let mut best_nu = NextUse::Line(0);
        for (pr, occupant) in self.pr_to_vr.iter().enumerate() {
            let pr = pr as u32;
            if self.pinned.contains(&pr) {
                continue;
            }
            let vr = occupant.expect("no free register in eviction scan");
            let nu = self.vr_nu[vr as usize];
            if best_pr.is_none() || nu > best_nu {
                best_pr = Some(pr);
                best_nu = nu;
            }
        }
        best_pr.expect("register file exhausted by pinned operands")
    }

    /// Make `pr` empty, spilling its occupant if the value cannot be
    /// recovered any other way
    fn evict(&mut self, pr: u32) {
        let Some(old_vr) = self.pr_to_vr[pr as usize] else {
            return;
        };
        let old = old_vr as usize;

        if self.vr_const[old].is_some() {
            trace!("dropping vr{} from r{} (rematerializable)", old_vr, pr);
        } else if self.vr_spill_addr[old].is_some() {
            trace!("dropping vr{} from r{} (already spilled)", old_vr, pr);
        } else {
            let addr = self.next_spill;
            self.next_spill += SPILL_STEP;
            self.vr_spill_addr[old] = Some(addr);
            trace!("spilling vr{} from r{} to {}", old_vr, pr, addr);
            self.out.push(AsmOp::LoadI(addr, self.scratch));
            self.out.push(AsmOp::Store(pr, self.scratch));
        }

        self.vr_to_pr[old] = None;
        self.pr_to_vr[pr as usize] = None;
    }

    /// Bring a used vr into a physical register, emitting restore code
    /// if its value lives in memory or is a deferred constant
    fn materialize_use(&mut self, vr: i32) -> u32 {
        if let Some(pr) = self.vr_to_pr[vr as usize] {
            self.pinned.push(pr);
            return pr;
        }

        let pr = self.select_pr();
        self.evict(pr);

        if let Some(value) = self.vr_const[vr as usize] {
            // Rematerialize; the constant stays usable until the vr dies
            self.out.push(AsmOp::LoadI(value, pr));
        } else if let Some(addr) = self.vr_spill_addr[vr as usize] {
            self.out.push(AsmOp::LoadI(addr, self.scratch));
            self.out.push(AsmOp::Load(self.scratch, pr));
        } else {
            // Upward-exposed value, assumed live-in; nothing to restore
            trace!("vr{} assumed live-in at r{}", vr, pr);
        }

        self.bind(vr, pr);
        self.pinned.push(pr);
        pr
    }

    /// Choose a physical register for a defined vr
    fn bind_def(&mut self, vr: i32) -> u32 {
        // A real definition invalidates any leftover constant status
        self.vr_const[vr as usize] = None;

        let pr = self.select_pr();
        self.evict(pr);
        self.bind(vr, pr);
        pr
    }

    fn bind(&mut self, vr: i32, pr: u32) {
        self.vr_to_pr[vr as usize] = Some(pr);
        self.pr_to_vr[pr as usize] = Some(vr);
    }

    fn free(&mut self, vr: i32) {
        if let Some(pr) = self.vr_to_pr[vr as usize].take() {
            self.pr_to_vr[pr as usize] = None;
        }
    }

    fn run(mut self, block: &mut Block) -> Vec<AsmOp> {
        for op in block.iter_mut() {
            match op.opcode {
                Opcode::LoadI => {
                    // Defer: no register, no emission. The constant is
                    // produced at first use, or never if the vr is dead.
                    let vr = op.operands[2].vr;
                    if vr >= 0 {
                        self.vr_const[vr as usize] = Some(op.operands[0].sr);
                        self.vr_nu[vr as usize] = op.operands[2].nu;
                        trace!("deferring loadI {} => vr{}", op.operands[0].sr, vr);
                    }
                    continue;
                }
                Opcode::Output => {
                    self.out.push(AsmOp::Output(op.operands[0].sr));
                    continue;
                }
                Opcode::Nop => {
                    self.out.push(AsmOp::Nop);
                    continue;
                }
                _ => {}
            }

            // Uses, in position order; spill and restore code for each
            // operand precedes the operation itself
            self.pinned.clear();
            for &i in op.use_indices() {
                let vr = op.operands[i].vr;
                if vr < 0 {
                    continue;
                }
                let pr = self.materialize_use(vr);
                op.operands[i].pr = pr as i32;
                self.vr_nu[vr as usize] = op.operands[i].nu;
            }

            // A use with no further reference dies here; its register is
            // free for the definition
            for &i in op.use_indices() {
                let vr = op.operands[i].vr;
                if vr >= 0 && op.operands[i].nu == NextUse::Never {
                    self.free(vr);
                }
            }
            self.pinned.clear();

            if let Some(d) = op.def_index() {
                let vr = op.operands[d].vr;
                if vr >= 0 {
                    let pr = self.bind_def(vr);
                    op.operands[d].pr = pr as i32;
                    self.vr_nu[vr as usize] = op.operands[d].nu;
                    if op.operands[d].nu == NextUse::Never {
                        self.free(vr);
                    }
                }
            }

            let [op1, op2, op3] = &op.operands;
            self.out.push(match op.opcode {
                Opcode::Load => AsmOp::Load(op1.pr as u32, op3.pr as u32),
                Opcode::Store => AsmOp::Store(op1.pr as u32, op3.pr as u32),
                _ => AsmOp::Arith(op.opcode, op1.pr as u32, op2.pr as u32, op3.pr as u32),
            });
        }

        debug!(
            "allocation emitted {} instructions, {} spill slots",
            self.out.len(),
            (self.next_spill - SPILL_BASE) / SPILL_STEP
        );
        self.out
    }
}

/// Allocate the renamed block onto `k` physical registers, filling every
/// operand's `pr` slot and returning the rewritten instruction stream.
///
/// `vr_count` is the value returned by [`crate::rename`]. The caller has
/// already validated `3 <= k <= 64`.
pub fn allocate(block: &mut Block, k: u32, vr_count: usize) -> Vec<AsmOp> {
    debug_assert!((3..=64).contains(&k));
    Allocator::new(k, vr_count).run(block)
}
