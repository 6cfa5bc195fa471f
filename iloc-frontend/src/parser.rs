//! ILOC Parser
//!
//! Line-oriented recursive descent over the token stream. Errors are
//! non-fatal within parsing: each diagnostic is recorded and the parser
//! skips to the next line, so one bad operation does not hide the rest.
//! Downstream stages must not run when any error was reported.

use crate::ir::{Block, Opcode, Operand, Operation};
use crate::lexer::{Lexer, Token, TokenType};
use iloc_common::{CompilerError, ErrorReporter, SourceLocation};
use log::debug;

/// Parse error types specific to the parser
#[derive(Debug, Clone)]
pub enum ParseError {
    /// The lexer produced an error token
    Lexical { message: String, location: SourceLocation },
    /// The grammar expected a different token
    UnexpectedToken { expected: String, found: Token },
}

impl From<ParseError> for CompilerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Lexical { message, location } => CompilerError::lex(message, location),
            ParseError::UnexpectedToken { expected, found } => CompilerError::parse(
                format!("expected {}, found {}", expected, found.token_type),
                found.location,
            ),
        }
    }
}

/// ILOC parser with per-line error recovery
pub struct Parser {
    lexer: Lexer,
    current: Token,
    reporter: ErrorReporter,
    block: Block,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            reporter: ErrorReporter::new(),
            block: Block::new(),
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Skip the remainder of the current line, consuming its terminator
    fn skip_line(&mut self) {
        while !matches!(
            self.current.token_type,
            TokenType::Newline | TokenType::EndOfFile
        ) {
            self.advance();
        }
        if self.current.token_type == TokenType::Newline {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match &self.current.token_type {
            TokenType::Error(message) => ParseError::Lexical {
                message: message.clone(),
                location: self.current.location,
            },
            _ => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current.clone(),
            },
        }
    }

    fn expect_register(&mut self, context: &str) -> Result<i32, ParseError> {
        match self.current.token_type {
            TokenType::Register(n) => {
                self.advance();
                Ok(n as i32)
            }
            _ => Err(self.unexpected(&format!("register {}", context))),
        }
    }

    fn expect_constant(&mut self, context: &str) -> Result<i32, ParseError> {
        match self.current.token_type {
            TokenType::Constant(c) => {
                self.advance();
                Ok(c)
            }
            _ => Err(self.unexpected(&format!("constant {}", context))),
        }
    }

    fn expect_arrow(&mut self, context: &str) -> Result<(), ParseError> {
        match self.current.token_type {
            TokenType::Arrow => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(&format!("'=>' {}", context))),
        }
    }

    fn expect_comma(&mut self, context: &str) -> Result<(), ParseError> {
        match self.current.token_type {
            TokenType::Comma => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(&format!("',' {}", context))),
        }
    }

    /// Parse one operation; the opcode token is current on entry
    fn parse_operation(&mut self, opcode: Opcode, line: u32) -> Result<Operation, ParseError> {
        let mut op = Operation::new(line, opcode);
        self.advance();

        match opcode {
            Opcode::LoadI => {
                op.operands[0] = Operand::with_sr(self.expect_constant("after 'loadI'")?);
                self.expect_arrow("after constant")?;
                op.operands[2] = Operand::with_sr(self.expect_register("after '=>'")?);
            }
            Opcode::Load | Opcode::Store => {
                op.operands[0] =
                    Operand::with_sr(self.expect_register(&format!("after '{}'", opcode))?);
                self.expect_arrow("after register")?;
                op.operands[2] = Operand::with_sr(self.expect_register("after '=>'")?);
            }
            op_kind if op_kind.is_arith() => {
                op.operands[0] =
                    Operand::with_sr(self.expect_register(&format!("after '{}'", opcode))?);
                self.expect_comma("after first register")?;
                op.operands[1] = Operand::with_sr(self.expect_register("after ','")?);
                self.expect_arrow("after second register")?;
                op.operands[2] = Operand::with_sr(self.expect_register("after '=>'")?);
            }
            Opcode::Output => {
                op.operands[0] = Operand::with_sr(self.expect_constant("after 'output'")?);
            }
            _ => {} // nop has no operands
        }

        // Nothing else may follow the operation on its line
        match self.current.token_type {
            TokenType::Newline | TokenType::EndOfFile => Ok(op),
            _ => Err(self.unexpected("end of line after operation")),
        }
    }

    /// Parse the whole input, returning the block or every diagnostic
    pub fn parse(mut self) -> Result<Block, Vec<CompilerError>> {
        loop {
            match self.current.token_type.clone() {
                TokenType::EndOfFile => break,
                TokenType::Newline => self.advance(),
                TokenType::Op(opcode) => {
                    let line = self.current.location.line;
                    match self.parse_operation(opcode, line) {
                        Ok(op) => self.block.push(op),
                        Err(err) => {
                            self.reporter.error(err.into());
                            self.skip_line();
                        }
                    }
                }
                _ => {
                    let err = self.unexpected("an opcode");
                    self.reporter.error(err.into());
                    self.skip_line();
                }
            }
        }

        if self.reporter.has_errors() {
            debug!("parse finished with {}", self.reporter.summary());
            Err(self.reporter.into_errors())
        } else {
            debug!("parse succeeded with {} operations", self.block.len());
            Ok(self.block)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Result<Block, Vec<CompilerError>> {
        Parser::new(Lexer::new(input)).parse()
    }

    #[test]
    fn test_each_opcode_parses() {
        let input = "\
loadI 1024 => r0
load r0 => r1
store r1 => r0
add r1, r1 => r2
sub r2, r1 => r3
mult r3, r3 => r4
lshift r4, r1 => r5
rshift r5, r1 => r6
output 1024
nop
";
        let block = parse(input).expect("valid input");
        assert_eq!(block.len(), 10);

        let ops: Vec<Opcode> = block.iter().map(|op| op.opcode).collect();
        assert_eq!(ops[0], Opcode::LoadI);
        assert_eq!(ops[2], Opcode::Store);
        assert_eq!(ops[9], Opcode::Nop);
    }

    #[test]
    fn test_operand_slots() {
        let block = parse("add r1, r2 => r3\n").expect("valid input");
        let op = block.iter().next().unwrap();
        assert_eq!(op.line, 1);
        assert_eq!(op.operands[0].sr, 1);
        assert_eq!(op.operands[1].sr, 2);
        assert_eq!(op.operands[2].sr, 3);
        // Renaming has not run yet
        assert_eq!(op.operands[0].vr, -1);
        assert_eq!(op.operands[0].pr, -1);
    }

    #[test]
    fn test_immediate_in_first_slot() {
        let block = parse("loadI 42 => r7\noutput 1024\n").expect("valid input");
        let ops: Vec<&Operation> = block.iter().collect();
        assert_eq!(ops[0].operands[0].sr, 42);
        assert_eq!(ops[0].operands[2].sr, 7);
        assert_eq!(ops[1].operands[0].sr, 1024);
    }

    #[test]
    fn test_missing_arrow() {
        let errors = parse("loadI 1024 r0\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        let message = format!("{}", errors[0]);
        assert!(message.contains("line 1"), "got: {}", message);
        assert!(message.contains("'=>'"), "got: {}", message);
    }

    #[test]
    fn test_recovery_collects_multiple_errors() {
        let input = "\
loadI 1024 => r0
add r1 r2 => r3
store r0
nop
";
        let errors = parse(input).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(format!("{}", errors[0]).contains("line 2"));
        assert!(format!("{}", errors[1]).contains("line 3"));
    }

    #[test]
    fn test_trailing_garbage_detected() {
        let errors = parse("nop nop\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("end of line"));
    }

    #[test]
    fn test_lexical_error_reported() {
        let errors = parse("loadI 99999999999 => r0\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CompilerError::Lex { .. }));
    }

    #[test]
    fn test_non_opcode_line_start() {
        let errors = parse("r1 => r2\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(format!("{}", errors[0]).contains("an opcode"));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let input = "// program\n\nnop\n   // tail comment\n";
        let block = parse(input).expect("valid input");
        assert_eq!(block.len(), 1);
        assert_eq!(block.iter().next().unwrap().line, 3);
    }

    #[test]
    fn test_empty_input() {
        let block = parse("").expect("empty input is a valid empty block");
        assert!(block.is_empty());
    }
}
