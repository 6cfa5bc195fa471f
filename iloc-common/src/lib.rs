//! ILOC Register Allocator - Common Types and Diagnostics
//!
//! This crate contains shared types, error definitions, and diagnostic
//! utilities used across all components of the allocator.

pub mod error;
pub mod source_loc;

pub use error::{CompilerError, Diagnostic, ErrorReporter, Severity};
pub use source_loc::SourceLocation;
