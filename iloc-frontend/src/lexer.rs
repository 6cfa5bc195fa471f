//! ILOC Lexer
//!
//! Tokenizes ILOC source into a pull-based stream of tokens. The lexer
//! never aborts: malformed input becomes `Error` tokens so the parser
//! can report and resynchronize at the next line.

use crate::ir::Opcode;
use iloc_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest legal constant (2^31 - 1)
pub const MAX_CONSTANT: u64 = 2_147_483_647;

/// ILOC token types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Op(Opcode),
    Register(u32),
    Constant(i32),
    Comma,
    Arrow,
    Newline,
    EndOfFile,
    /// Malformed input; carries a description for diagnostics
    Error(String),
}

impl TokenType {
    /// Token class string used by scan mode
    pub fn category(&self) -> &'static str {
        match self {
            TokenType::Op(Opcode::LoadI) => "LOADI",
            TokenType::Op(Opcode::Load) | TokenType::Op(Opcode::Store) => "MEMOP",
            TokenType::Op(Opcode::Output) => "OUTPUT",
            TokenType::Op(Opcode::Nop) => "NOP",
            TokenType::Op(_) => "ARITHOP",
            TokenType::Register(_) => "REGISTER",
            TokenType::Constant(_) => "CONSTANT",
            TokenType::Comma => "COMMA",
            TokenType::Arrow => "INTO",
            TokenType::Newline => "ENDLINE",
            TokenType::EndOfFile => "EOF",
            TokenType::Error(_) => "ERROR",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Op(op) => write!(f, "{}", op),
            TokenType::Register(n) => write!(f, "r{}", n),
            TokenType::Constant(c) => write!(f, "{}", c),
            TokenType::Comma => write!(f, ","),
            TokenType::Arrow => write!(f, "=>"),
            TokenType::Newline => write!(f, "end of line"),
            TokenType::EndOfFile => write!(f, "end of file"),
            TokenType::Error(message) => write!(f, "{}", message),
        }
    }
}

/// A token with its lexeme and location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub location: SourceLocation,
}

/// Pull-based ILOC lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current_char();
        if ch.is_some() {
            self.position += 1;
            self.column += 1;
        }
        ch
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn token(&self, token_type: TokenType, lexeme: &str, location: SourceLocation) -> Token {
        Token {
            token_type,
            lexeme: lexeme.to_string(),
            location,
        }
    }

    /// Skip spaces, tabs, and `//` comments (comments run to end of line)
    fn skip_blanks(&mut self) {
        loop {
            match self.current_char() {
                Some(' ') | Some('\t') => {
                    self.advance();
                }
                Some('/') if self.peek_char(1) == Some('/') => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' || ch == '\r' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan the next token. Always makes progress; the final token is
    /// `EndOfFile`.
    pub fn next_token(&mut self) -> Token {
        self.skip_blanks();

        let location = self.location();
        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return self.token(TokenType::EndOfFile, "", location),
        };

        // Line terminators: \n, \r, \r\n, \n\r each count as one line
        if ch == '\n' || ch == '\r' {
            self.advance();
            if let Some(next) = self.current_char() {
                if (ch == '\n' && next == '\r') || (ch == '\r' && next == '\n') {
                    self.advance();
                }
            }
            self.line += 1;
            self.column = 1;
            return self.token(TokenType::Newline, "\\n", location);
        }

        if ch == ',' {
            self.advance();
            return self.token(TokenType::Comma, ",", location);
        }

        if ch == '=' {
            if self.peek_char(1) == Some('>') {
                self.advance();
                self.advance();
                return self.token(TokenType::Arrow, "=>", location);
            }
            self.advance();
            return self.token(
                TokenType::Error("expected '>' after '='".to_string()),
                "=",
                location,
            );
        }

        if ch.is_ascii_digit() {
            return self.scan_constant(location);
        }

        if ch.is_ascii_alphabetic() {
            return self.scan_word(location);
        }

        self.advance();
        let lexeme = ch.to_string();
        self.token(
            TokenType::Error(format!("unknown character '{}'", ch)),
            &lexeme,
            location,
        )
    }

    /// Run the lexer to completion (the last token is `EndOfFile`)
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.token_type == TokenType::EndOfFile;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn scan_constant(&mut self, location: SourceLocation) -> Token {
        let mut lexeme = String::new();
        while let Some(ch) = self.current_char() {
            if !ch.is_ascii_digit() {
                break;
            }
            lexeme.push(ch);
            self.advance();
        }

        match lexeme.parse::<u64>() {
            Ok(value) if value <= MAX_CONSTANT => {
                self.token(TokenType::Constant(value as i32), &lexeme, location)
            }
            _ => self.token(
                TokenType::Error(format!("constant {} exceeds {}", lexeme, MAX_CONSTANT)),
                &lexeme,
                location,
            ),
        }
    }

    fn scan_word(&mut self, location: SourceLocation) -> Token {
        let mut lexeme = String::new();
        while let Some(ch) = self.current_char() {
            if !ch.is_ascii_alphanumeric() {
                break;
            }
            lexeme.push(ch);
            self.advance();
        }

        // A register is 'r' followed by digits only
        if lexeme.len() > 1 && lexeme.starts_with('r') && lexeme[1..].bytes().all(|b| b.is_ascii_digit())
        {
            return match lexeme[1..].parse::<u32>() {
                Ok(n) => self.token(TokenType::Register(n), &lexeme, location),
                Err(_) => self.token(
                    TokenType::Error(format!("register number in '{}' is too large", lexeme)),
                    &lexeme,
                    location,
                ),
            };
        }

        match Opcode::from_mnemonic(&lexeme) {
            Some(op) => self.token(TokenType::Op(op), &lexeme, location),
            None => self.token(
                TokenType::Error(format!("unrecognized word '{}'", lexeme)),
                &lexeme,
                location,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_simple_operation() {
        assert_eq!(
            kinds("loadI 1024 => r0"),
            vec![
                TokenType::Op(Opcode::LoadI),
                TokenType::Constant(1024),
                TokenType::Arrow,
                TokenType::Register(0),
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_arith_with_comma() {
        assert_eq!(
            kinds("add r1, r2 => r3"),
            vec![
                TokenType::Op(Opcode::Add),
                TokenType::Register(1),
                TokenType::Comma,
                TokenType::Register(2),
                TokenType::Arrow,
                TokenType::Register(3),
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let input = "// header comment\n\nnop // trailing\n";
        assert_eq!(
            kinds(input),
            vec![
                TokenType::Newline,
                TokenType::Newline,
                TokenType::Op(Opcode::Nop),
                TokenType::Newline,
                TokenType::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_line_terminators_count_once() {
        for terminator in ["\n", "\r", "\r\n", "\n\r"] {
            let input = format!("nop{}nop{}nop", terminator, terminator);
            let mut lexer = Lexer::new(&input);
            let tokens = lexer.tokenize();
            let lines: Vec<u32> = tokens
                .iter()
                .filter(|t| t.token_type == TokenType::Op(Opcode::Nop))
                .map(|t| t.location.line)
                .collect();
            assert_eq!(lines, vec![1, 2, 3], "terminator {:?}", terminator);
        }
    }

    #[test]
    fn test_constant_limit() {
        assert_eq!(
            kinds("2147483647"),
            vec![TokenType::Constant(2147483647), TokenType::EndOfFile]
        );
        let tokens = kinds("2147483648");
        assert!(matches!(tokens[0], TokenType::Error(_)));
    }

    #[test]
    fn test_register_and_word_errors() {
        assert_eq!(
            kinds("r12"),
            vec![TokenType::Register(12), TokenType::EndOfFile]
        );
        // 'r' alone and words with trailing letters are not registers
        assert!(matches!(kinds("r")[0], TokenType::Error(_)));
        assert!(matches!(kinds("r1x")[0], TokenType::Error(_)));
        assert!(matches!(kinds("jump")[0], TokenType::Error(_)));
    }

    #[test]
    fn test_unknown_character() {
        let tokens = kinds("@");
        assert!(matches!(tokens[0], TokenType::Error(_)));
        assert_eq!(tokens[1], TokenType::EndOfFile);
    }

    #[test]
    fn test_bare_equals() {
        let tokens = kinds("= r1");
        assert!(matches!(tokens[0], TokenType::Error(_)));
        assert_eq!(tokens[1], TokenType::Register(1));
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenType::Op(Opcode::LoadI).category(), "LOADI");
        assert_eq!(TokenType::Op(Opcode::Load).category(), "MEMOP");
        assert_eq!(TokenType::Op(Opcode::Store).category(), "MEMOP");
        assert_eq!(TokenType::Op(Opcode::Lshift).category(), "ARITHOP");
        assert_eq!(TokenType::Op(Opcode::Output).category(), "OUTPUT");
        assert_eq!(TokenType::Op(Opcode::Nop).category(), "NOP");
        assert_eq!(TokenType::Register(3).category(), "REGISTER");
        assert_eq!(TokenType::Constant(7).category(), "CONSTANT");
        assert_eq!(TokenType::Arrow.category(), "INTO");
        assert_eq!(TokenType::Comma.category(), "COMMA");
        assert_eq!(TokenType::Newline.category(), "ENDLINE");
        assert_eq!(TokenType::EndOfFile.category(), "EOF");
    }

    #[test]
    fn test_column_tracking() {
        let mut lexer = Lexer::new("add r1, r2 => r3");
        let token = lexer.next_token();
        assert_eq!(token.location, SourceLocation::new(1, 1));
        let token = lexer.next_token();
        assert_eq!(token.location, SourceLocation::new(1, 5));
    }
}
