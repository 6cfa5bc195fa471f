//! ILOC Register Allocator - Allocation Passes
//!
//! This crate holds the two allocator passes that run after parsing:
//!
//! - Renaming: assigns virtual registers to source registers and
//!   computes next-use lines (forward walk, then backward walk).
//! - Allocation: rewrites the block onto `k` physical registers with
//!   the highest register reserved as spill scratch, spilling by
//!   furthest next use and rematerializing `loadI` constants.

pub mod allocate;
pub mod asm;
pub mod rename;

pub use allocate::allocate;
pub use asm::{write_ops, AsmOp};
pub use rename::{format_renamed, rename};
