//! Error types for the GVM compiler

use std::fmt;

use alloy_primitives::U256;
use thiserror::Error;

use crate::lexer::Span;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Lexical error during tokenization
    #[error("Lex error at {line}:{col}: {message}")]
    LexError { message: String, line: usize, col: usize },

    /// Syntax error during parsing
    #[error("Parse error at {line}:{col}: {message}")]
    ParseError { message: String, line: usize, col: usize },

    /// Semantic error raised while transforming a function
    #[error("{}", render_semantic(.kind, .function.as_deref(), .span.as_ref()))]
    SemanticError {
        kind: SemanticErrorKind,
        function: Option<String>,
        span: Option<Span>,
    },

    /// Compiler configuration (gvm.toml) error
    #[error("Config error: {0}")]
    Config(String),

    /// Malformed instruction stream
    #[error("Decode error at offset {offset}: {message}")]
    DecodeError { message: String, offset: usize },
}

/// Specific semantic error kinds for better diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// A `CONST` statement declares a name that is already a constant
    DuplicateConstant { name: String },

    /// A constant operand is referenced before its `CONST` declaration
    ConstantUsedBeforeDefinition { name: String },

    /// A `CONST` statement declares a name already used as a variable
    ConstantShadowsVariable { name: String },

    /// A `CONST` statement whose operand carries no literal value
    ConstantWithoutValue { name: String },

    /// A constant operand whose literal differs from its `CONST` declaration
    ConstantValueMismatch {
        name: String,
        declared: U256,
        found: U256,
    },

    /// A predecessor/successor address that names no block of the function
    UnknownBlock { address: String },

    /// Two blocks of one function share an address
    DuplicateBlock { address: String },

    /// Two functions of one program share a name
    DuplicateFunction { name: String },

    /// Operand count does not match the opcode's arity
    ArityMismatch {
        opcode: String,
        expected: usize,
        found: usize,
    },

    /// Assignment target on an opcode that produces no value
    UnexpectedTarget { opcode: String },

    /// Phi source count does not match the block's predecessor count
    PhiEdgeMismatch { predecessors: usize, sources: usize },

    /// A jump whose target names no reachable block
    UnresolvedJumpTarget { target: String },
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticErrorKind::DuplicateConstant { name } => {
                write!(f, "constant '{}' defined more than once", name)
            }
            SemanticErrorKind::ConstantUsedBeforeDefinition { name } => {
                write!(f, "constant '{}' used before definition", name)
            }
            SemanticErrorKind::ConstantShadowsVariable { name } => {
                write!(f, "constant '{}' redefines an existing variable", name)
            }
            SemanticErrorKind::ConstantWithoutValue { name } => {
                write!(f, "CONST target '{}' carries no literal value", name)
            }
            SemanticErrorKind::ConstantValueMismatch { name, declared, found } => {
                write!(
                    f,
                    "constant '{}' is declared as {:#x} but referenced as {:#x}",
                    name, declared, found
                )
            }
            SemanticErrorKind::UnknownBlock { address } => {
                write!(f, "reference to unknown block {}", address)
            }
            SemanticErrorKind::DuplicateBlock { address } => {
                write!(f, "block {} declared more than once", address)
            }
            SemanticErrorKind::DuplicateFunction { name } => {
                write!(f, "function '{}' declared more than once", name)
            }
            SemanticErrorKind::ArityMismatch { opcode, expected, found } => {
                write!(f, "{} expects {} operands, got {}", opcode, expected, found)
            }
            SemanticErrorKind::UnexpectedTarget { opcode } => {
                write!(f, "{} produces no value but has an assignment target", opcode)
            }
            SemanticErrorKind::PhiEdgeMismatch { predecessors, sources } => {
                write!(
                    f,
                    "PHI has {} sources but its block has {} predecessors",
                    sources, predecessors
                )
            }
            SemanticErrorKind::UnresolvedJumpTarget { target } => {
                write!(f, "unresolved jump target {}", target)
            }
        }
    }
}

fn render_semantic(kind: &SemanticErrorKind, function: Option<&str>, span: Option<&Span>) -> String {
    let mut out = format!("error[{}]: {}", kind.code(), kind);
    if let Some(span) = span {
        out.push_str(&format!(" at {}:{}", span.line, span.col));
    }
    if let Some(function) = function {
        out.push_str(&format!(" (in function '{}')", function));
    }
    out
}

impl SemanticErrorKind {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            SemanticErrorKind::DuplicateConstant { .. } => "E0101",
            SemanticErrorKind::ConstantUsedBeforeDefinition { .. } => "E0102",
            SemanticErrorKind::ConstantShadowsVariable { .. } => "E0103",
            SemanticErrorKind::ConstantWithoutValue { .. } => "E0104",
            SemanticErrorKind::ConstantValueMismatch { .. } => "E0105",
            SemanticErrorKind::UnknownBlock { .. } => "E0111",
            SemanticErrorKind::DuplicateBlock { .. } => "E0112",
            SemanticErrorKind::DuplicateFunction { .. } => "E0113",
            SemanticErrorKind::ArityMismatch { .. } => "E0121",
            SemanticErrorKind::UnexpectedTarget { .. } => "E0122",
            SemanticErrorKind::PhiEdgeMismatch { .. } => "E0123",
            SemanticErrorKind::UnresolvedJumpTarget { .. } => "E0131",
        }
    }
}

impl Error {
    pub fn semantic(kind: SemanticErrorKind) -> Self {
        Error::SemanticError { kind, function: None, span: None }
    }

    /// Attach a source position unless one is already present
    pub fn at(self, at: Span) -> Self {
        match self {
            Error::SemanticError { kind, function, span } => Error::SemanticError {
                kind,
                function,
                span: span.or(Some(at)),
            },
            other => other,
        }
    }

    /// Attach the enclosing function name unless one is already present
    pub fn in_function(self, name: &str) -> Self {
        match self {
            Error::SemanticError { kind, function, span } => Error::SemanticError {
                kind,
                function: function.or_else(|| Some(name.to_string())),
                span,
            },
            other => other,
        }
    }

    /// Diagnostic code for the error
    pub fn code(&self) -> &'static str {
        match self {
            Error::LexError { .. } => "E0001",
            Error::ParseError { .. } => "E0002",
            Error::SemanticError { kind, .. } => kind.code(),
            Error::Config(_) => "E0003",
            Error::DecodeError { .. } => "E0004",
        }
    }

    /// Source position (line, col) if the error carries one
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::LexError { line, col, .. } | Error::ParseError { line, col, .. } => {
                Some((*line, *col))
            }
            Error::SemanticError { span, .. } => span.map(|s| (s.line, s.col)),
            Error::Config(_) | Error::DecodeError { .. } => None,
        }
    }
}
