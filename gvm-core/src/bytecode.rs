//! Compiled GVM program model
//!
//! Output of the transformer: one dense, linear instruction stream per
//! function plus the symbol tables needed to execute and debug it.
//!
//! ## Stream layout
//!
//! ```text
//! block      := PHI_START phi* PHI_END op* BLOCK_END <block id>
//! phi        := PHI <target> <n> (<pred block id> <source>){n}
//! op         := <opcode> <operand>{arity}
//!             | <variadic opcode> <defs> <uses> <operand>{defs + uses}
//! ```
//!
//! Operands are variable indices, except the target slot of `JUMP`/`JUMPI`
//! which holds the absolute offset of the destination block.

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::U256;
use serde::Serialize;

use crate::ast::canonical_address;
use crate::error::{Error, Result};
use crate::opcode::{Marker, Opcode, Word};

/// A constant table entry: variable index and its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstSym {
    pub index: usize,
    pub value: U256,
}

/// Bookkeeping for one `JUMP`/`JUMPI`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JumpFixup {
    pub opcode: Opcode,
    /// Originating statement, as source text
    pub statement: String,
    /// Symbolic target block address
    pub target: String,
    /// Start offset of the target block once resolved
    pub resolved: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompiledFunction {
    pub name: String,
    pub instructions: Vec<Word>,
    pub constants: Vec<ConstSym>,
    /// Variable (and constant) name -> index
    pub variables: BTreeMap<String, usize>,
    /// Canonical block address -> start offset in `instructions`
    pub block_starts: BTreeMap<String, usize>,
    /// Canonical block address -> dense block id
    pub block_ids: BTreeMap<String, usize>,
    /// Offset of each jump opcode -> fixup
    pub jumps: BTreeMap<usize, JumpFixup>,
    /// Offset of each resolved `CALLPRIVATE` -> callee function index
    pub calls: BTreeMap<usize, usize>,
    pub num_vars: usize,
    pub num_blocks: usize,
}

/// One decoded instruction of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    PhiStart,
    /// `edges` holds `(predecessor block id, source index)` pairs
    Phi { target: Word, edges: Vec<(Word, Word)> },
    PhiEnd,
    Op { opcode: Opcode, operands: Vec<Word> },
    Variadic { opcode: Opcode, defs: usize, operands: Vec<Word> },
    BlockEnd { block: Word },
}

impl CompiledFunction {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn variable(&self, name: &str) -> Option<usize> {
        self.variables.get(name).copied()
    }

    pub fn constant(&self, index: usize) -> Option<U256> {
        self.constants.iter().find(|c| c.index == index).map(|c| c.value)
    }

    pub fn block_start(&self, address: &str) -> Option<usize> {
        self.block_starts.get(&canonical_address(address)).copied()
    }

    pub fn block_id(&self, address: &str) -> Option<usize> {
        self.block_ids.get(&canonical_address(address)).copied()
    }

    /// Walk the stream back into structured instructions with their offsets
    pub fn decode(&self) -> Result<Vec<(usize, Instruction)>> {
        let words = &self.instructions;
        let mut decoded = Vec::new();
        let mut pc = 0;

        while pc < words.len() {
            let at = pc;
            let word = words[pc];
            pc += 1;

            let instruction = if let Some(marker) = Marker::from_code(word) {
                match marker {
                    Marker::PhiStart => Instruction::PhiStart,
                    Marker::PhiEnd => Instruction::PhiEnd,
                    Marker::BlockEnd => {
                        let block = take(words, &mut pc, 1, at)?[0];
                        Instruction::BlockEnd { block }
                    }
                }
            } else if let Some(opcode) = Opcode::from_code(word) {
                match opcode {
                    Opcode::Phi => {
                        let header = take(words, &mut pc, 2, at)?;
                        let (target, n) = (header[0], header[1]);
                        let pairs = take(words, &mut pc, n.saturating_mul(2), at)?;
                        let edges = pairs.chunks(2).map(|p| (p[0], p[1])).collect();
                        Instruction::Phi { target, edges }
                    }
                    Opcode::Const => {
                        return Err(decode_error(at, "CONST is never encoded"));
                    }
                    op if op.is_variadic() => {
                        let header = take(words, &mut pc, 2, at)?;
                        let (defs, uses) = (header[0], header[1]);
                        let operands = take(words, &mut pc, defs.saturating_add(uses), at)?.to_vec();
                        Instruction::Variadic { opcode: op, defs, operands }
                    }
                    op => {
                        let count = op
                            .operand_count()
                            .ok_or_else(|| decode_error(at, "opcode without fixed arity"))?;
                        let operands = take(words, &mut pc, count, at)?.to_vec();
                        Instruction::Op { opcode: op, operands }
                    }
                }
            } else {
                return Err(decode_error(at, &format!("unknown word {:#x}", word)));
            };

            decoded.push((at, instruction));
        }

        Ok(decoded)
    }
}

fn take<'a>(words: &'a [Word], pc: &mut usize, n: usize, at: usize) -> Result<&'a [Word]> {
    let slice = pc
        .checked_add(n)
        .and_then(|end| words.get(*pc..end))
        .ok_or_else(|| decode_error(at, "truncated instruction"))?;
    *pc += n;
    Ok(slice)
}

fn decode_error(offset: usize, message: &str) -> Error {
    Error::DecodeError { message: message.to_string(), offset }
}

impl fmt::Display for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function {} (vars: {}, blocks: {})",
            self.name, self.num_vars, self.num_blocks
        )?;
        for constant in &self.constants {
            writeln!(f, "    const %{} = {:#x}", constant.index, constant.value)?;
        }

        let decoded = match self.decode() {
            Ok(decoded) => decoded,
            Err(err) => return writeln!(f, "    <{}>", err),
        };

        for (offset, instruction) in decoded {
            write!(f, "  {:04}: ", offset)?;
            match instruction {
                Instruction::PhiStart => writeln!(f, "PHI_START")?,
                Instruction::PhiEnd => writeln!(f, "PHI_END")?,
                Instruction::BlockEnd { block } => writeln!(f, "BLOCK_END #{}", block)?,
                Instruction::Phi { target, edges } => {
                    let edges: Vec<String> =
                        edges.iter().map(|(block, src)| format!("#{} -> %{}", block, src)).collect();
                    writeln!(f, "%{} = PHI [{}]", target, edges.join(", "))?;
                }
                Instruction::Op { opcode, operands } => {
                    let rendered: Vec<String> = operands
                        .iter()
                        .enumerate()
                        .map(|(i, w)| {
                            if i == 0 && opcode.is_jump() {
                                format!("@{}", w)
                            } else {
                                format!("%{}", w)
                            }
                        })
                        .collect();
                    writeln!(f, "{} {}", opcode, rendered.join(", "))?;
                }
                Instruction::Variadic { opcode, defs, operands } => {
                    let rendered: Vec<String> = operands.iter().map(|w| format!("%{}", w)).collect();
                    let (targets, uses) = rendered.split_at(defs.min(rendered.len()));
                    if targets.is_empty() {
                        writeln!(f, "{} {}", opcode, uses.join(", "))?;
                    } else {
                        writeln!(f, "{} = {} {}", targets.join(", "), opcode, uses.join(", "))?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompiledProgram {
    /// Index of the designated entry function
    pub entry: Option<usize>,
    /// Functions ordered by function index
    pub functions: Vec<CompiledFunction>,
    pub function_indices: BTreeMap<String, usize>,
}

impl CompiledProgram {
    pub fn entry(&self) -> Option<&CompiledFunction> {
        self.entry.and_then(|index| self.functions.get(index))
    }

    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.function_indices
            .get(name)
            .and_then(|&index| self.functions.get(index))
    }
}

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, function) in self.functions.iter().enumerate() {
            if Some(index) == self.entry {
                writeln!(f, "; entry")?;
            }
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
