//! ILOC Register Allocator Driver
//!
//! Command-line entry point. Selects a pipeline stage to run (scan,
//! parse, print IR, rename, or allocate with a register budget) over a
//! single input file. Diagnostics go to stderr, program output to
//! stdout; the exit code is nonzero on any error.

use clap::Parser;
use iloc_alloc::{allocate, format_renamed, rename, write_ops};
use iloc_common::CompilerError;
use iloc_frontend::{Frontend, Lexer, TokenType};
use log::debug;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "iloca")]
#[command(about = "ILOC local register allocator")]
#[command(version = "0.1.0")]
#[command(after_help = "\
Modes (highest priority first when several flags are given):
  iloca -r <file>     parse and print the IR table
  iloca -p <file>     parse and report success or errors (default)
  iloca -s <file>     scan and print tokens
  iloca -x <file>     parse, rename, print ILOC over virtual registers
  iloca <k> <file>    parse, rename, allocate with k registers (3..=64)")]
struct Cli {
    /// Scan only: print the token stream
    #[arg(short = 's')]
    scan: bool,

    /// Parse only: report success with the operation count
    #[arg(short = 'p')]
    parse: bool,

    /// Print the IR in a human-readable table after parsing
    #[arg(short = 'r')]
    print_ir: bool,

    /// Rename only: print the block over virtual registers
    #[arg(short = 'x')]
    rename: bool,

    /// Debug level (0=none, 1=basic, 2=verbose, 3=debug, 4=trace)
    #[arg(short = 'd', long = "debug", default_value = "0")]
    debug: u8,

    /// `<file>`, or `<k> <file>` to allocate with k registers
    #[arg(value_name = "ARG")]
    args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Scan,
    Parse,
    PrintIr,
    Rename,
    Allocate(u32),
}

/// Resolve the requested mode and input path. Mode flags take priority
/// `-r > -p > -s > -x`; a positional register count applies only when no
/// flag is present, and a bare file defaults to parse mode.
fn resolve_mode(cli: &Cli) -> Result<(Mode, PathBuf), CompilerError> {
    let flag_mode = if cli.print_ir {
        Some(Mode::PrintIr)
    } else if cli.parse {
        Some(Mode::Parse)
    } else if cli.scan {
        Some(Mode::Scan)
    } else if cli.rename {
        Some(Mode::Rename)
    } else {
        None
    };

    if let Some(mode) = flag_mode {
        return match cli.args.as_slice() {
            [file] => Ok((mode, PathBuf::from(file))),
            [] => Err(CompilerError::Usage {
                message: "no input file specified".to_string(),
            }),
            _ => Err(CompilerError::Usage {
                message: "expected a single input file".to_string(),
            }),
        };
    }

    match cli.args.as_slice() {
        [k, file] => match k.parse::<i64>() {
            Ok(k) if (3..=64).contains(&k) => {
                Ok((Mode::Allocate(k as u32), PathBuf::from(file)))
            }
            Ok(k) => Err(CompilerError::BadRegisterCount { k }),
            Err(_) => Err(CompilerError::Usage {
                message: format!("expected a register count, got '{}'", k),
            }),
        },
        [file] => Ok((Mode::Parse, PathBuf::from(file))),
        [] => Err(CompilerError::Usage {
            message: "no input file specified".to_string(),
        }),
        _ => Err(CompilerError::Usage {
            message: "too many arguments".to_string(),
        }),
    }
}

fn scan_tokens(source: &str) {
    let mut lexer = Lexer::new(source);
    for token in lexer.tokenize() {
        match token.token_type {
            TokenType::Newline | TokenType::EndOfFile => {}
            _ => println!(
                "{}: {} \"{}\"",
                token.location.line,
                token.token_type.category(),
                token.lexeme
            ),
        }
    }
}

fn run(cli: &Cli) -> Result<(), Vec<CompilerError>> {
    let (mode, path) = resolve_mode(cli).map_err(|e| vec![e])?;
    debug!("mode {:?} on {}", mode, path.display());

    let source = fs::read_to_string(&path).map_err(|e| {
        vec![CompilerError::Io {
            message: format!("cannot read '{}': {}", path.display(), e),
        }]
    })?;

    match mode {
        Mode::Scan => {
            scan_tokens(&source);
            Ok(())
        }
        Mode::Parse => match Frontend::parse_source(&source) {
            Ok(block) => {
                println!("Parse succeeded. Processed {} operations.", block.len());
                Ok(())
            }
            Err(errors) => {
                eprintln!("Parse found errors.");
                Err(errors)
            }
        },
        Mode::PrintIr => {
            let block = Frontend::parse_source(&source)?;
            print!("{}", block);
            Ok(())
        }
        Mode::Rename => {
            let mut block = Frontend::parse_source(&source)?;
            rename(&mut block);
            print!("{}", format_renamed(&block));
            Ok(())
        }
        Mode::Allocate(k) => {
            let mut block = Frontend::parse_source(&source)?;
            let vr_count = rename(&mut block);
            let ops = allocate(&mut block, k, vr_count);
            let stdout = io::stdout();
            write_ops(&mut stdout.lock(), &ops)
                .map_err(|e| vec![CompilerError::from(e)])?;
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.debug {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(errors) = run(&cli) {
        for error in &errors {
            eprintln!("{}", error);
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(scan: bool, parse: bool, print_ir: bool, rename: bool, args: &[&str]) -> Cli {
        Cli {
            scan,
            parse,
            print_ir,
            rename,
            debug: 0,
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_flag_precedence() {
        let (mode, _) =
            resolve_mode(&cli(true, true, true, true, &["in.i"])).unwrap();
        assert_eq!(mode, Mode::PrintIr);

        let (mode, _) = resolve_mode(&cli(true, true, false, false, &["in.i"])).unwrap();
        assert_eq!(mode, Mode::Parse);

        let (mode, _) = resolve_mode(&cli(true, false, false, true, &["in.i"])).unwrap();
        assert_eq!(mode, Mode::Scan);

        let (mode, _) = resolve_mode(&cli(false, false, false, true, &["in.i"])).unwrap();
        assert_eq!(mode, Mode::Rename);
    }

    #[test]
    fn test_allocate_mode_parses_k() {
        let (mode, path) = resolve_mode(&cli(false, false, false, false, &["8", "in.i"])).unwrap();
        assert_eq!(mode, Mode::Allocate(8));
        assert_eq!(path, PathBuf::from("in.i"));
    }

    #[test]
    fn test_register_count_bounds() {
        let err = resolve_mode(&cli(false, false, false, false, &["2", "in.i"])).unwrap_err();
        assert_eq!(err, CompilerError::BadRegisterCount { k: 2 });

        let err = resolve_mode(&cli(false, false, false, false, &["65", "in.i"])).unwrap_err();
        assert_eq!(err, CompilerError::BadRegisterCount { k: 65 });

        assert!(resolve_mode(&cli(false, false, false, false, &["3", "in.i"])).is_ok());
        assert!(resolve_mode(&cli(false, false, false, false, &["64", "in.i"])).is_ok());
    }

    #[test]
    fn test_bare_file_defaults_to_parse() {
        let (mode, _) = resolve_mode(&cli(false, false, false, false, &["in.i"])).unwrap();
        assert_eq!(mode, Mode::Parse);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(resolve_mode(&cli(false, true, false, false, &[])).is_err());
        assert!(resolve_mode(&cli(false, false, false, false, &[])).is_err());
    }

    #[test]
    fn test_non_numeric_k_is_an_error() {
        let err =
            resolve_mode(&cli(false, false, false, false, &["many", "in.i"])).unwrap_err();
        assert!(matches!(err, CompilerError::Usage { .. }));
    }
}
