//! Transformer for TAC programs
//!
//! Flattens each function's CFG into a linear GVM instruction stream.
//!
//! ## Passes per function
//!
//! 1. Index blocks by canonical address and check every CFG reference
//! 2. Depth-first traversal from the entry block to fix block ids
//! 3. Encode blocks in traversal order (phi region, body, block end)
//! 4. Rewrite every jump target slot with the start offset of its block

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy_primitives::U256;
use tracing::{debug, trace};

use crate::ast::{Block, Function, Operand, OperandKind, Program, Statement, canonical_address};
use crate::bytecode::{CompiledFunction, CompiledProgram, ConstSym, JumpFixup};
use crate::config::CompilerConfig;
use crate::error::{Error, Result, SemanticErrorKind};
use crate::lexer::Span;
use crate::opcode::{Marker, Opcode, Word};

/// Value held by a jump target slot until the fixup pass runs
const UNRESOLVED: Word = Word::MAX;

/// Compiles a [`Program`] into a [`CompiledProgram`]
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    config: CompilerConfig,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile every function of the program
    ///
    /// The configured entry function, when present, is pinned to index 0;
    /// the remaining functions follow in program order. Any error aborts the
    /// whole compilation.
    pub fn transform(&self, program: &Program) -> Result<CompiledProgram> {
        let order = self.function_order(program)?;

        let callees: HashMap<String, usize> = order
            .iter()
            .enumerate()
            .map(|(index, function)| (canonical_address(&function.name), index))
            .collect();

        let mut functions = Vec::with_capacity(order.len());
        let mut function_indices = BTreeMap::new();

        for (index, function) in order.into_iter().enumerate() {
            let compiled = FunctionEncoder::new(function, &self.config, &callees)
                .encode()
                .map_err(|e| e.in_function(&function.name))?;

            debug!(
                function = %function.name,
                index,
                blocks = compiled.num_blocks,
                vars = compiled.num_vars,
                instructions = compiled.instructions.len(),
                "compiled function"
            );

            function_indices.insert(function.name.clone(), index);
            functions.push(compiled);
        }

        let entry = if functions.is_empty() { None } else { Some(0) };
        Ok(CompiledProgram { entry, functions, function_indices })
    }

    /// Function index assignment: entry function first, then program order
    fn function_order<'p>(&self, program: &'p Program) -> Result<Vec<&'p Function>> {
        let mut seen = HashSet::new();
        for function in &program.functions {
            if !seen.insert(canonical_address(&function.name)) {
                return Err(Error::semantic(SemanticErrorKind::DuplicateFunction {
                    name: function.name.clone(),
                })
                .at(function.span));
            }
        }

        let entry = canonical_address(&self.config.entry_function);
        let is_entry = |f: &&Function| canonical_address(&f.name) == entry;

        let mut order: Vec<&Function> = program.functions.iter().filter(is_entry).collect();
        order.extend(program.functions.iter().filter(|f| !is_entry(f)));
        Ok(order)
    }
}

/// Per-function encoding state
struct FunctionEncoder<'a> {
    function: &'a Function,
    config: &'a CompilerConfig,
    /// Canonical function name -> function index
    callees: &'a HashMap<String, usize>,
    /// Canonical block address -> block
    blocks: HashMap<String, &'a Block>,
    /// Names declared by `CONST` and their values
    constants: HashMap<String, U256>,
    /// Jump opcode offset -> originating statement position
    fixup_spans: BTreeMap<usize, Span>,
    out: CompiledFunction,
}

impl<'a> FunctionEncoder<'a> {
    fn new(
        function: &'a Function,
        config: &'a CompilerConfig,
        callees: &'a HashMap<String, usize>,
    ) -> Self {
        Self {
            function,
            config,
            callees,
            blocks: HashMap::new(),
            constants: HashMap::new(),
            fixup_spans: BTreeMap::new(),
            out: CompiledFunction::new(&function.name),
        }
    }

    fn encode(mut self) -> Result<CompiledFunction> {
        self.index_blocks()?;

        let order = self.traversal();
        for (id, block) in order.iter().enumerate() {
            self.out.block_ids.insert(canonical_address(&block.address), id);
        }

        for (id, block) in order.iter().enumerate() {
            self.encode_block(id, block)?;
        }

        self.resolve_jumps()?;

        self.out.num_blocks = order.len();
        self.out.num_vars = self.out.variables.len();
        Ok(self.out)
    }

    fn index_blocks(&mut self) -> Result<()> {
        let function = self.function;

        for block in &function.blocks {
            if self.blocks.insert(canonical_address(&block.address), block).is_some() {
                return Err(Error::semantic(SemanticErrorKind::DuplicateBlock {
                    address: block.address.clone(),
                })
                .at(block.span));
            }
        }

        for block in &function.blocks {
            let predecessors: &[String] = if self.config.validate_predecessors {
                &block.predecessors
            } else {
                &[]
            };
            for address in block.successors.iter().chain(predecessors) {
                if !self.blocks.contains_key(&canonical_address(address)) {
                    return Err(Error::semantic(SemanticErrorKind::UnknownBlock {
                        address: address.clone(),
                    })
                    .at(block.span));
                }
            }
        }

        Ok(())
    }

    /// Reachable blocks in visiting order
    ///
    /// A jump's branch target is pushed before the declared successors, so
    /// fallthrough blocks are visited first.
    fn traversal(&self) -> Vec<&'a Block> {
        let function = self.function;
        let Some(entry) = function.entry_block() else {
            return Vec::new();
        };

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![entry];

        while let Some(block) = stack.pop() {
            if !visited.insert(canonical_address(&block.address)) {
                continue;
            }
            trace!(block = %block.address, id = order.len(), "visit block");
            order.push(block);

            let branch = block
                .terminator()
                .and_then(Statement::jump_target)
                .map(|target| canonical_address(&target));

            if let Some(target) = &branch {
                if !visited.contains(target) {
                    if let Some(next) = self.blocks.get(target) {
                        stack.push(*next);
                    }
                }
            }

            for successor in &block.successors {
                let address = canonical_address(successor);
                if visited.contains(&address) || branch.as_ref() == Some(&address) {
                    continue;
                }
                if let Some(next) = self.blocks.get(&address) {
                    stack.push(*next);
                }
            }
        }

        order
    }

    fn encode_block(&mut self, id: usize, block: &Block) -> Result<()> {
        self.out
            .block_starts
            .insert(canonical_address(&block.address), self.out.instructions.len());

        self.emit(Marker::PhiStart.code());
        for stmt in block.statements.iter().filter(|s| s.operation == Opcode::Phi) {
            self.encode_phi(block, stmt).map_err(|e| e.at(stmt.span))?;
        }
        self.emit(Marker::PhiEnd.code());

        for stmt in block.statements.iter().filter(|s| s.operation != Opcode::Phi) {
            self.encode_statement(stmt).map_err(|e| e.at(stmt.span))?;
        }

        self.emit(Marker::BlockEnd.code());
        self.emit(id);
        Ok(())
    }

    /// `[PHI, target, n, (pred id, source) * n]`
    ///
    /// The i-th source flows in along the edge from the i-th declared
    /// predecessor. Edges from unreachable predecessors are dropped.
    fn encode_phi(&mut self, block: &Block, stmt: &Statement) -> Result<()> {
        let (target, sources) = match stmt.operands.split_first() {
            Some((target, sources)) if stmt.defs == 1 => (target, sources),
            _ => {
                return Err(Error::semantic(SemanticErrorKind::ArityMismatch {
                    opcode: stmt.operation.to_string(),
                    expected: block.predecessors.len() + 1,
                    found: stmt.operands.len(),
                }));
            }
        };

        if sources.len() != block.predecessors.len() {
            return Err(Error::semantic(SemanticErrorKind::PhiEdgeMismatch {
                predecessors: block.predecessors.len(),
                sources: sources.len(),
            }));
        }

        let target = self.operand_index(target)?;
        let mut edges = Vec::with_capacity(sources.len());
        for (predecessor, source) in block.predecessors.iter().zip(sources) {
            let Some(&pred_id) = self.out.block_ids.get(&canonical_address(predecessor)) else {
                continue;
            };
            edges.push((pred_id, self.operand_index(source)?));
        }

        self.emit(Opcode::Phi.code());
        self.emit(target);
        self.emit(edges.len());
        for (pred_id, source) in edges {
            self.emit(pred_id);
            self.emit(source);
        }
        Ok(())
    }

    fn encode_statement(&mut self, stmt: &Statement) -> Result<()> {
        match (stmt.operation, stmt.operation.operand_count()) {
            (Opcode::Const, _) => self.encode_const(stmt),
            (_, Some(expected)) => self.encode_fixed(stmt, expected),
            (_, None) => self.encode_variadic(stmt),
        }
    }

    /// `CONST` emits nothing; it binds a fresh index to a literal value
    fn encode_const(&mut self, stmt: &Statement) -> Result<()> {
        let [operand] = stmt.operands.as_slice() else {
            return Err(Error::semantic(SemanticErrorKind::ArityMismatch {
                opcode: stmt.operation.to_string(),
                expected: 1,
                found: stmt.operands.len(),
            }));
        };

        let name = &operand.name;
        let Some(value) = operand.value() else {
            return Err(Error::semantic(SemanticErrorKind::ConstantWithoutValue {
                name: name.clone(),
            }));
        };
        if self.constants.contains_key(name) {
            return Err(Error::semantic(SemanticErrorKind::DuplicateConstant {
                name: name.clone(),
            }));
        }
        if self.out.variables.contains_key(name) {
            return Err(Error::semantic(SemanticErrorKind::ConstantShadowsVariable {
                name: name.clone(),
            }));
        }

        let index = self.allocate(name);
        self.constants.insert(name.clone(), value);
        self.out.constants.push(ConstSym { index, value });
        Ok(())
    }

    fn encode_fixed(&mut self, stmt: &Statement, expected: usize) -> Result<()> {
        let op = stmt.operation;

        if (stmt.defs > 0 && !op.produces_value()) || stmt.defs > 1 {
            return Err(Error::semantic(SemanticErrorKind::UnexpectedTarget {
                opcode: op.to_string(),
            }));
        }
        if stmt.operands.len() != expected {
            return Err(Error::semantic(SemanticErrorKind::ArityMismatch {
                opcode: op.to_string(),
                expected,
                found: stmt.operands.len(),
            }));
        }

        let offset = self.out.instructions.len();
        self.emit(op.code());

        for (slot, operand) in stmt.operands.iter().enumerate() {
            if slot == 0 && op.is_jump() {
                if operand.is_constant() {
                    self.operand_index(operand)?;
                }
                self.record_jump(offset, stmt);
                self.emit(UNRESOLVED);
            } else {
                let index = self.operand_index(operand)?;
                self.emit(index);
            }
        }
        Ok(())
    }

    /// `[opcode, defs, uses, operand...]`
    fn encode_variadic(&mut self, stmt: &Statement) -> Result<()> {
        let op = stmt.operation;
        let defs = stmt.targets().len();
        let uses = stmt.uses().len();

        let offset = self.out.instructions.len();
        self.emit(op.code());
        self.emit(defs);
        self.emit(uses);
        for operand in &stmt.operands {
            let index = self.operand_index(operand)?;
            self.emit(index);
        }

        if op == Opcode::CallPrivate && self.config.resolve_private_calls {
            self.record_call(offset, stmt);
        }
        Ok(())
    }

    fn record_jump(&mut self, offset: usize, stmt: &Statement) {
        let target = stmt
            .jump_target()
            .map(|target| canonical_address(&target))
            .unwrap_or_default();
        self.fixup_spans.insert(offset, stmt.span);
        self.out.jumps.insert(
            offset,
            JumpFixup {
                opcode: stmt.operation,
                statement: stmt.to_string(),
                target,
                resolved: None,
            },
        );
    }

    /// A private call whose callee constant names a known function
    fn record_call(&mut self, offset: usize, stmt: &Statement) {
        let Some(value) = stmt.uses().first().and_then(Operand::value) else {
            return;
        };
        let callee = canonical_address(&format!("{:#x}", value));
        if let Some(&index) = self.callees.get(&callee) {
            trace!(offset, callee = %callee, index, "private call");
            self.out.calls.insert(offset, index);
        }
    }

    /// Index of an operand in the shared variable/constant index space
    fn operand_index(&mut self, operand: &Operand) -> Result<Word> {
        match operand.kind {
            OperandKind::Variable => Ok(self.allocate(&operand.name)),
            OperandKind::Constant(found) => {
                let declared = self.constants.get(&operand.name).copied();
                let index = self.out.variables.get(&operand.name).copied();
                match (declared, index) {
                    (Some(declared), Some(index)) if declared == found => Ok(index),
                    (Some(declared), Some(_)) => {
                        Err(Error::semantic(SemanticErrorKind::ConstantValueMismatch {
                            name: operand.name.clone(),
                            declared,
                            found,
                        }))
                    }
                    _ => Err(Error::semantic(SemanticErrorKind::ConstantUsedBeforeDefinition {
                        name: operand.name.clone(),
                    })),
                }
            }
        }
    }

    /// First-use index allocation
    fn allocate(&mut self, name: &str) -> Word {
        if let Some(&index) = self.out.variables.get(name) {
            return index;
        }
        let index = self.out.variables.len();
        self.out.variables.insert(name.to_string(), index);
        index
    }

    fn resolve_jumps(&mut self) -> Result<()> {
        for (&offset, fixup) in self.out.jumps.iter_mut() {
            let Some(&start) = self.out.block_starts.get(&fixup.target) else {
                let err = Error::semantic(SemanticErrorKind::UnresolvedJumpTarget {
                    target: fixup.target.clone(),
                });
                return Err(match self.fixup_spans.get(&offset) {
                    Some(span) => err.at(*span),
                    None => err,
                });
            };
            if let Some(slot) = self.out.instructions.get_mut(offset + 1) {
                *slot = start;
            }
            fixup.resolved = Some(start);
            trace!(offset, target = %fixup.target, start, "resolved jump");
        }
        Ok(())
    }

    fn emit(&mut self, word: Word) {
        self.out.instructions.push(word);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const PS: Word = Marker::PhiStart as Word;
    const PE: Word = Marker::PhiEnd as Word;
    const BE: Word = Marker::BlockEnd as Word;

    fn compile(source: &str) -> Result<CompiledProgram> {
        Transformer::new().transform(&parse(source)?)
    }

    fn kind(err: Error) -> SemanticErrorKind {
        match err {
            Error::SemanticError { kind, .. } => kind,
            other => panic!("expected semantic error, got {:?}", other),
        }
    }

    #[test]
    fn test_single_block() {
        let program = compile(
            "FUNCTION f(UINT256 x) PUBLIC { BEGIN BLOCK 0x0: PREV=[], SUCC=[]: 0x1: y = ADD x, x STOP }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(
            f.instructions,
            vec![PS, PE, Opcode::Add.code(), 0, 1, 1, Opcode::Stop.code(), BE, 0]
        );
        assert_eq!(f.variable("y"), Some(0));
        assert_eq!(f.variable("x"), Some(1));
        assert_eq!(f.num_vars, 2);
        assert_eq!(f.num_blocks, 1);
    }

    #[test]
    fn test_const_is_elided() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v1(0x20) = CONST
                 v2 = MLOAD v1(0x20)
                 STOP
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(
            f.instructions,
            vec![PS, PE, Opcode::MLoad.code(), 1, 0, Opcode::Stop.code(), BE, 0]
        );
        assert_eq!(f.constants, vec![ConstSym { index: 0, value: U256::from(0x20) }]);
        assert_eq!(f.constant(0), Some(U256::from(0x20)));
    }

    #[test]
    fn test_duplicate_constant() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v1(0x1) = CONST
                 v1(0x2) = CONST
             }",
        )
        .unwrap_err();
        assert_eq!(err.position().map(|(line, _)| line), Some(4));
        assert!(matches!(kind(err), SemanticErrorKind::DuplicateConstant { name } if name == "v1"));
    }

    #[test]
    fn test_constant_used_before_definition() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v2 = MLOAD v1(0x20)
             }",
        )
        .unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::ConstantUsedBeforeDefinition { .. }));
    }

    #[test]
    fn test_constant_shadows_variable() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v1 = CALLER
                 v1(0x1) = CONST
             }",
        )
        .unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::ConstantShadowsVariable { .. }));
    }

    #[test]
    fn test_constant_value_mismatch() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[0x20, 0x30]
                 v1(0x20) = CONST
                 JUMP v1(0x30)
               BEGIN BLOCK 0x20 PREV=[0x0], SUCC=[]
                 STOP
               BEGIN BLOCK 0x30 PREV=[0x0], SUCC=[]
                 STOP
             }",
        )
        .unwrap_err();
        assert_eq!(err.code(), "E0105");
        assert_eq!(err.position().map(|(line, _)| line), Some(4));
        assert_eq!(
            kind(err),
            SemanticErrorKind::ConstantValueMismatch {
                name: "v1".into(),
                declared: U256::from(0x20),
                found: U256::from(0x30),
            }
        );
    }

    #[test]
    fn test_constant_reference_with_declared_value() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v1(0x0020) = CONST
                 v2 = ADD v1(0x20), v1(0x20)
                 STOP
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(&f.instructions[2..6], &[Opcode::Add.code(), 1, 0, 0]);
    }

    #[test]
    fn test_const_without_value() {
        let err = compile(
            "FUNCTION f() PUBLIC { BEGIN BLOCK 0x0 PREV=[], SUCC=[] v1 = CONST }",
        )
        .unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::ConstantWithoutValue { .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = compile(
            "FUNCTION f() PUBLIC { BEGIN BLOCK 0x0 PREV=[], SUCC=[] y = ADD x }",
        )
        .unwrap_err();
        assert_eq!(
            kind(err),
            SemanticErrorKind::ArityMismatch { opcode: "ADD".into(), expected: 3, found: 2 }
        );
    }

    #[test]
    fn test_unexpected_target() {
        let err = compile(
            "FUNCTION f() PUBLIC { BEGIN BLOCK 0x0 PREV=[], SUCC=[] y = MSTORE a, b }",
        )
        .unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::UnexpectedTarget { opcode } if opcode == "MSTORE"));
    }

    #[test]
    fn test_unknown_successor() {
        let err = compile(
            "FUNCTION f() PUBLIC { BEGIN BLOCK 0x0 PREV=[], SUCC=[0x9] STOP }",
        )
        .unwrap_err();
        assert!(matches!(kind(err.clone()), SemanticErrorKind::UnknownBlock { address } if address == "0x9"));
        assert!(err.to_string().contains("in function 'f'"));
    }

    #[test]
    fn test_unknown_predecessor_can_be_ignored() {
        let source = "FUNCTION f() PUBLIC { BEGIN BLOCK 0x0 PREV=[0x7], SUCC=[] STOP }";
        assert!(matches!(
            kind(compile(source).unwrap_err()),
            SemanticErrorKind::UnknownBlock { .. }
        ));

        let config = CompilerConfig { validate_predecessors: false, ..CompilerConfig::default() };
        let program = Transformer::with_config(config).transform(&parse(source).unwrap()).unwrap();
        assert_eq!(program.functions[0].num_blocks, 1);
    }

    #[test]
    fn test_duplicate_block() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x1 PREV=[], SUCC=[]
               BEGIN BLOCK 0x01 PREV=[], SUCC=[]
             }",
        )
        .unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::DuplicateBlock { .. }));
    }

    #[test]
    fn test_duplicate_function() {
        let err = compile("FUNCTION f() PUBLIC { } FUNCTION f() PUBLIC { }").unwrap_err();
        assert!(matches!(kind(err), SemanticErrorKind::DuplicateFunction { .. }));
    }

    #[test]
    fn test_jump_is_resolved_to_block_start() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[0x10]
                 v1(0x10) = CONST
                 JUMP v1(0x10)
               BEGIN BLOCK 0x10 PREV=[0x0], SUCC=[]
                 STOP
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(
            f.instructions,
            vec![
                PS, PE, Opcode::Jump.code(), 6, BE, 0,
                PS, PE, Opcode::Stop.code(), BE, 1,
            ]
        );
        let fixup = &f.jumps[&2];
        assert_eq!(fixup.target, "0x10");
        assert_eq!(fixup.resolved, Some(6));
        assert_eq!(f.block_start("0x10"), Some(6));
    }

    #[test]
    fn test_unresolved_jump_target() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 v1(0x44) = CONST
                 JUMP v1(0x44)
             }",
        )
        .unwrap_err();
        assert_eq!(err.position().map(|(line, _)| line), Some(4));
        assert!(matches!(kind(err), SemanticErrorKind::UnresolvedJumpTarget { target } if target == "0x44"));
    }

    #[test]
    fn test_fallthrough_visited_before_branch_target() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[0x5, 0x9]
                 v1(0x9) = CONST
                 JUMPI v1(0x9), c
               BEGIN BLOCK 0x5 PREV=[0x0], SUCC=[]
                 STOP
               BEGIN BLOCK 0x9 PREV=[0x0], SUCC=[]
                 STOP
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(f.block_ids["0x0"], 0);
        assert_eq!(f.block_ids["0x5"], 1);
        assert_eq!(f.block_ids["0x9"], 2);
    }

    #[test]
    fn test_unreachable_block_is_not_encoded() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 STOP
               BEGIN BLOCK 0x1 PREV=[], SUCC=[]
                 v = CALLER
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        assert_eq!(f.num_blocks, 1);
        assert!(f.block_start("0x1").is_none());
        assert!(f.variable("v").is_none());
    }

    #[test]
    fn test_phi_edges_follow_predecessors() {
        let program = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[0x1, 0x2]
                 v9(0x2) = CONST
                 JUMPI v9(0x2), c
               BEGIN BLOCK 0x1 PREV=[0x0], SUCC=[0x3]
                 a = CALLER
               BEGIN BLOCK 0x2 PREV=[0x0], SUCC=[0x3]
                 b = ORIGIN
               BEGIN BLOCK 0x3 PREV=[0x1, 0x2], SUCC=[]
                 r = PHI a, b
                 STOP
             }",
        )
        .unwrap();
        let f = &program.functions[0];
        let start = f.block_start("0x3").unwrap();
        let phi = &f.instructions[start + 1..start + 8];
        let (r, a, b) = (f.variable("r").unwrap(), f.variable("a").unwrap(), f.variable("b").unwrap());
        let (id1, id2) = (f.block_ids["0x1"], f.block_ids["0x2"]);
        assert_eq!(phi, &[Opcode::Phi.code(), r, 2, id1, a, id2, b]);
    }

    #[test]
    fn test_phi_edge_mismatch() {
        let err = compile(
            "FUNCTION f() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[0x1]
               BEGIN BLOCK 0x1 PREV=[0x0], SUCC=[]
                 r = PHI a, b
             }",
        )
        .unwrap_err();
        assert_eq!(
            kind(err),
            SemanticErrorKind::PhiEdgeMismatch { predecessors: 1, sources: 2 }
        );
    }

    #[test]
    fn test_variadic_encoding_and_private_calls() {
        let program = compile(
            "FUNCTION 0x1a(a) PRIVATE {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 RETURNPRIVATE r, a
             }
             FUNCTION __function_selector__() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 f(0x1A) = CONST
                 x, y = CALLPRIVATE f(0x1A), z
                 STOP
             }",
        )
        .unwrap();
        let selector = &program.functions[0];
        assert_eq!(selector.name, "__function_selector__");
        assert_eq!(
            &selector.instructions[2..9],
            &[Opcode::CallPrivate.code(), 2, 2, 1, 2, 0, 3]
        );
        assert_eq!(selector.calls.get(&2), Some(&1));

        let private = &program.functions[1];
        assert_eq!(
            &private.instructions[2..7],
            &[Opcode::ReturnPrivate.code(), 0, 2, 0, 1]
        );
    }

    #[test]
    fn test_private_call_resolution_can_be_disabled() {
        let source = "FUNCTION 0x1a() PRIVATE { }
             FUNCTION g() PUBLIC {
               BEGIN BLOCK 0x0 PREV=[], SUCC=[]
                 f(0x1a) = CONST
                 CALLPRIVATE f(0x1a)
             }";
        let config = CompilerConfig { resolve_private_calls: false, ..CompilerConfig::default() };
        let program = Transformer::with_config(config).transform(&parse(source).unwrap()).unwrap();
        assert!(program.functions[1].calls.is_empty());
    }

    #[test]
    fn test_configured_entry_function() {
        let source = "FUNCTION a() PUBLIC { } FUNCTION main() PUBLIC { }";
        let config = CompilerConfig { entry_function: "main".into(), ..CompilerConfig::default() };
        let program = Transformer::with_config(config).transform(&parse(source).unwrap()).unwrap();
        assert_eq!(program.entry().map(|f| f.name.as_str()), Some("main"));
        assert_eq!(program.function_indices["a"], 1);
    }

    #[test]
    fn test_empty_program_has_no_entry() {
        let program = compile("").unwrap();
        assert_eq!(program.entry, None);
        assert!(program.functions.is_empty());
    }
}
