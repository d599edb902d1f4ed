//! CFG intermediate representation for TAC programs
//!
//! A program is a list of functions, each function a list of basic blocks
//! with source-declared predecessor/successor addresses, each block a list
//! of statements.

use std::fmt;

use alloy_primitives::U256;

use crate::lexer::Span;
use crate::opcode::Opcode;

/// A complete TAC program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Visibility is implied by how the function is named in source:
/// identifiers are public, hex literals private
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Parameter types accepted in public function signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint256,
    Bool,
    Bytes,
}

/// A function parameter
///
/// Public functions list typed parameters (`UINT256 x` or just `UINT256`),
/// private functions list bare identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Option<ParamType>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    /// First block is the entry block
    pub blocks: Vec<Block>,
    pub span: Span,
}

impl Function {
    pub fn entry_block(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Find a block by address, comparing hex addresses canonically
    pub fn block(&self, address: &str) -> Option<&Block> {
        let wanted = canonical_address(address);
        self.blocks
            .iter()
            .find(|b| canonical_address(&b.address) == wanted)
    }
}

/// A basic block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub address: String,
    pub predecessors: Vec<String>,
    pub successors: Vec<String>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Block {
    /// Last statement of the block
    pub fn terminator(&self) -> Option<&Statement> {
        self.statements.last()
    }
}

/// A single TAC statement: `[label:] [targets =] OP operands`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub address: Option<String>,
    pub operation: Opcode,
    /// Assignment targets first, then uses
    pub operands: Vec<Operand>,
    /// Number of leading operands written as assignment targets
    pub defs: usize,
    pub span: Span,
}

impl Statement {
    pub fn targets(&self) -> &[Operand] {
        &self.operands[..self.defs.min(self.operands.len())]
    }

    pub fn uses(&self) -> &[Operand] {
        &self.operands[self.defs.min(self.operands.len())..]
    }

    /// Symbolic target of a `JUMP`/`JUMPI`: the constant value of the first
    /// operand, or its name when it is a plain label
    pub fn jump_target(&self) -> Option<String> {
        if !self.operation.is_jump() {
            return None;
        }
        self.operands.first().map(|operand| match operand.kind {
            OperandKind::Constant(value) => format!("{:#x}", value),
            OperandKind::Variable => operand.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Variable,
    /// Constant with its literal 256-bit value
    Constant(U256),
}

/// An operand (`GVariable`): `v1` or `v1(0x20)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub name: String,
    pub kind: OperandKind,
}

impl Operand {
    pub fn variable(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: OperandKind::Variable }
    }

    pub fn constant(name: impl Into<String>, value: U256) -> Self {
        Self { name: name.into(), kind: OperandKind::Constant(value) }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, OperandKind::Constant(_))
    }

    pub fn value(&self) -> Option<U256> {
        match self.kind {
            OperandKind::Constant(value) => Some(value),
            OperandKind::Variable => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::Variable => write!(f, "{}", self.name),
            OperandKind::Constant(value) => write!(f, "{}({:#x})", self.name, value),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(address) = &self.address {
            write!(f, "{}: ", address)?;
        }
        let join = |ops: &[Operand]| {
            ops.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(", ")
        };
        if self.defs > 0 {
            write!(f, "{} = ", join(self.targets()))?;
        }
        write!(f, "{}", self.operation)?;
        if !self.uses().is_empty() {
            write!(f, " {}", join(self.uses()))?;
        }
        Ok(())
    }
}

/// Canonical form of a block address
///
/// Hex addresses are lower-cased and stripped of leading zeros so `0x001A`
/// and `0x1a` name the same block. Anything else is kept verbatim.
pub fn canonical_address(address: &str) -> String {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"));
    match digits {
        Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
            let trimmed = digits.trim_start_matches('0');
            if trimmed.is_empty() {
                "0x0".to_string()
            } else {
                format!("0x{}", trimmed.to_ascii_lowercase())
            }
        }
        _ => address.to_string(),
    }
}
