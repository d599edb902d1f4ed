//! # GVM - TAC to linear bytecode
//!
//! Compiles the textual three-address code (TAC) emitted by EVM bytecode
//! decompilers into dense, linear instruction streams for the GVM register
//! machine.
//!
//! ## Example
//!
//! ```tac
//! FUNCTION f(UINT256 x) PUBLIC {
//!   BEGIN BLOCK 0x0: PREV=[], SUCC=[]:
//!     0x1: y = ADD x, x
//!     STOP
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! TAC Source
//!     ↓ lexer
//! Token Stream
//!     ↓ parser
//! CFG (functions → blocks → statements)
//!     ↓ transformer
//! CompiledProgram (one instruction stream per function)
//! ```

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod opcode;
pub mod parser;

pub use ast::{Block, Function, Operand, OperandKind, Param, ParamType, Program, Statement, Visibility};
pub use bytecode::{CompiledFunction, CompiledProgram, ConstSym, Instruction, JumpFixup};
pub use compiler::Transformer;
pub use config::CompilerConfig;
pub use error::{Error, Result, SemanticErrorKind};
pub use lexer::{Keyword, Lexer, Span, SpannedToken, Token, TokenKind};
pub use opcode::{ArityClass, Marker, OpInfo, Opcode, Word};
pub use parser::Parser;

/// Scan TAC source into tokens, ending with [`Token::Eof`]
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    Lexer::new(source).tokenize_with_spans()
}

/// Parse TAC source into its CFG representation
pub fn parse(source: &str) -> Result<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

/// Compile TAC source with the default configuration
pub fn compile(source: &str) -> Result<CompiledProgram> {
    compile_with_config(source, &CompilerConfig::default())
}

pub fn compile_with_config(source: &str, config: &CompilerConfig) -> Result<CompiledProgram> {
    let program = parse(source)?;
    Transformer::with_config(config.clone()).transform(&program)
}
