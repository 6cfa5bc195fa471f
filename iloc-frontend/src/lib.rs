//! ILOC Register Allocator - Frontend
//!
//! This crate provides the front half of the pipeline:
//! - Lexer: tokenizes ILOC source
//! - Parser: builds the IR block with per-line error recovery
//! - IR: the block of operations shared with the allocator passes

pub mod ir;
pub mod lexer;
pub mod parser;

pub use ir::{Block, NextUse, Opcode, Operand, Operation};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{ParseError, Parser};

use iloc_common::CompilerError;

/// High-level frontend interface
pub struct Frontend;

impl Frontend {
    /// Parse ILOC source into an IR block
    pub fn parse_source(source: &str) -> Result<Block, Vec<CompilerError>> {
        let lexer = Lexer::new(source);
        Parser::new(lexer).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let block = Frontend::parse_source("loadI 1 => r1\nadd r1, r1 => r2\noutput 1024\n")
            .expect("valid program");
        assert_eq!(block.len(), 3);
    }

    #[test]
    fn test_parse_source_errors() {
        let errors = Frontend::parse_source("load =>\n").unwrap_err();
        assert!(!errors.is_empty());
    }
}
