//! Opcode table for GVM
//!
//! Every TAC operation is described by one [`OpInfo`] row: mnemonic, arity
//! class, number of inputs and whether it defines a value. The transformer
//! drives encoding from this table alone.

use serde::Serialize;

/// One slot of the linear instruction stream
pub type Word = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Opcode {
    // Nullary
    Const,
    Throw,
    Stop,
    Address,
    Origin,
    Caller,
    CallValue,
    CallDataSize,
    CodeSize,
    GasPrice,
    ReturnDataSize,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    GasLimit,
    ChainId,
    SelfBalance,
    Msize,
    Gas,

    // Unary
    IsZero,
    Balance,
    CallDataLoad,
    ExtCodeSize,
    ExtCodeHash,
    BlockHash,
    MLoad,
    SLoad,
    Jump,
    SelfDestruct,
    Not,

    // Binary
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    And,
    Or,
    Xor,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    MStore,
    MStore8,
    SStore,
    JumpI,
    Revert,
    Return,
    Log0,

    // Ternary
    CallDataCopy,
    CodeCopy,
    ReturnDataCopy,
    Log1,
    Create,

    // N-ary
    Phi,
    ExtCodeCopy,
    Log2,
    Log3,
    Log4,
    Call,
    CallCode,
    DelegateCall,
    Create2,
    StaticCall,
    CallPrivate,
    ReturnPrivate,
}

/// Arity class of an opcode, as grouped in the TAC dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArityClass {
    Nullary,
    Unary,
    Binary,
    Ternary,
    Nary,
}

/// Static description of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub mnemonic: &'static str,
    pub class: ArityClass,
    /// Number of input operands (ignored when `variadic`)
    pub inputs: usize,
    /// Whether the statement defines a value through its first operand
    pub produces_value: bool,
    /// Takes every operand that appears in the source
    pub variadic: bool,
}

const fn fixed(mnemonic: &'static str, class: ArityClass, inputs: usize, produces_value: bool) -> OpInfo {
    OpInfo { mnemonic, class, inputs, produces_value, variadic: false }
}

const fn variadic(mnemonic: &'static str, produces_value: bool) -> OpInfo {
    OpInfo { mnemonic, class: ArityClass::Nary, inputs: 0, produces_value, variadic: true }
}

use ArityClass::*;

impl Opcode {
    /// All opcodes, indexed by their stream encoding
    pub const ALL: [Opcode; 79] = [
        Opcode::Const,
        Opcode::Throw,
        Opcode::Stop,
        Opcode::Address,
        Opcode::Origin,
        Opcode::Caller,
        Opcode::CallValue,
        Opcode::CallDataSize,
        Opcode::CodeSize,
        Opcode::GasPrice,
        Opcode::ReturnDataSize,
        Opcode::Coinbase,
        Opcode::Timestamp,
        Opcode::Number,
        Opcode::Difficulty,
        Opcode::GasLimit,
        Opcode::ChainId,
        Opcode::SelfBalance,
        Opcode::Msize,
        Opcode::Gas,
        Opcode::IsZero,
        Opcode::Balance,
        Opcode::CallDataLoad,
        Opcode::ExtCodeSize,
        Opcode::ExtCodeHash,
        Opcode::BlockHash,
        Opcode::MLoad,
        Opcode::SLoad,
        Opcode::Jump,
        Opcode::SelfDestruct,
        Opcode::Not,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Sub,
        Opcode::Div,
        Opcode::SDiv,
        Opcode::Mod,
        Opcode::SMod,
        Opcode::AddMod,
        Opcode::MulMod,
        Opcode::Exp,
        Opcode::SignExtend,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Slt,
        Opcode::Sgt,
        Opcode::Eq,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Byte,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Sar,
        Opcode::Sha3,
        Opcode::MStore,
        Opcode::MStore8,
        Opcode::SStore,
        Opcode::JumpI,
        Opcode::Revert,
        Opcode::Return,
        Opcode::Log0,
        Opcode::CallDataCopy,
        Opcode::CodeCopy,
        Opcode::ReturnDataCopy,
        Opcode::Log1,
        Opcode::Create,
        Opcode::Phi,
        Opcode::ExtCodeCopy,
        Opcode::Log2,
        Opcode::Log3,
        Opcode::Log4,
        Opcode::Call,
        Opcode::CallCode,
        Opcode::DelegateCall,
        Opcode::Create2,
        Opcode::StaticCall,
        Opcode::CallPrivate,
        Opcode::ReturnPrivate,
    ];

    pub fn info(self) -> OpInfo {
        match self {
            Opcode::Const => fixed("CONST", Nullary, 0, true),
            Opcode::Throw => fixed("THROW", Nullary, 0, false),
            Opcode::Stop => fixed("STOP", Nullary, 0, false),
            Opcode::Address => fixed("ADDRESS", Nullary, 0, true),
            Opcode::Origin => fixed("ORIGIN", Nullary, 0, true),
            Opcode::Caller => fixed("CALLER", Nullary, 0, true),
            Opcode::CallValue => fixed("CALLVALUE", Nullary, 0, true),
            Opcode::CallDataSize => fixed("CALLDATASIZE", Nullary, 0, true),
            Opcode::CodeSize => fixed("CODESIZE", Nullary, 0, true),
            Opcode::GasPrice => fixed("GASPRICE", Nullary, 0, true),
            Opcode::ReturnDataSize => fixed("RETURNDATASIZE", Nullary, 0, true),
            Opcode::Coinbase => fixed("COINBASE", Nullary, 0, true),
            Opcode::Timestamp => fixed("TIMESTAMP", Nullary, 0, true),
            Opcode::Number => fixed("NUMBER", Nullary, 0, true),
            Opcode::Difficulty => fixed("DIFFICULTY", Nullary, 0, true),
            Opcode::GasLimit => fixed("GASLIMIT", Nullary, 0, true),
            Opcode::ChainId => fixed("CHAINID", Nullary, 0, true),
            Opcode::SelfBalance => fixed("SELFBALANCE", Nullary, 0, true),
            Opcode::Msize => fixed("MSIZE", Nullary, 0, true),
            Opcode::Gas => fixed("GAS", Nullary, 0, true),

            Opcode::IsZero => fixed("ISZERO", Unary, 1, true),
            Opcode::Balance => fixed("BALANCE", Unary, 1, true),
            Opcode::CallDataLoad => fixed("CALLDATALOAD", Unary, 1, true),
            Opcode::ExtCodeSize => fixed("EXTCODESIZE", Unary, 1, true),
            Opcode::ExtCodeHash => fixed("EXTCODEHASH", Unary, 1, true),
            Opcode::BlockHash => fixed("BLOCKHASH", Unary, 1, true),
            Opcode::MLoad => fixed("MLOAD", Unary, 1, true),
            Opcode::SLoad => fixed("SLOAD", Unary, 1, true),
            Opcode::Jump => fixed("JUMP", Unary, 1, false),
            Opcode::SelfDestruct => fixed("SELFDESTRUCT", Unary, 1, false),
            Opcode::Not => fixed("NOT", Unary, 1, true),

            Opcode::Add => fixed("ADD", Binary, 2, true),
            Opcode::Mul => fixed("MUL", Binary, 2, true),
            Opcode::Sub => fixed("SUB", Binary, 2, true),
            Opcode::Div => fixed("DIV", Binary, 2, true),
            Opcode::SDiv => fixed("SDIV", Binary, 2, true),
            Opcode::Mod => fixed("MOD", Binary, 2, true),
            Opcode::SMod => fixed("SMOD", Binary, 2, true),
            Opcode::AddMod => fixed("ADDMOD", Binary, 3, true),
            Opcode::MulMod => fixed("MULMOD", Binary, 3, true),
            Opcode::Exp => fixed("EXP", Binary, 2, true),
            Opcode::SignExtend => fixed("SIGNEXTEND", Binary, 2, true),
            Opcode::Lt => fixed("LT", Binary, 2, true),
            Opcode::Gt => fixed("GT", Binary, 2, true),
            Opcode::Slt => fixed("SLT", Binary, 2, true),
            Opcode::Sgt => fixed("SGT", Binary, 2, true),
            Opcode::Eq => fixed("EQ", Binary, 2, true),
            Opcode::And => fixed("AND", Binary, 2, true),
            Opcode::Or => fixed("OR", Binary, 2, true),
            Opcode::Xor => fixed("XOR", Binary, 2, true),
            Opcode::Byte => fixed("BYTE", Binary, 2, true),
            Opcode::Shl => fixed("SHL", Binary, 2, true),
            Opcode::Shr => fixed("SHR", Binary, 2, true),
            Opcode::Sar => fixed("SAR", Binary, 2, true),
            Opcode::Sha3 => fixed("SHA3", Binary, 2, true),
            Opcode::MStore => fixed("MSTORE", Binary, 2, false),
            Opcode::MStore8 => fixed("MSTORE8", Binary, 2, false),
            Opcode::SStore => fixed("SSTORE", Binary, 2, false),
            // target, condition
            Opcode::JumpI => fixed("JUMPI", Binary, 2, false),
            Opcode::Revert => fixed("REVERT", Binary, 2, false),
            Opcode::Return => fixed("RETURN", Binary, 2, false),
            Opcode::Log0 => fixed("LOG0", Binary, 2, false),

            Opcode::CallDataCopy => fixed("CALLDATACOPY", Ternary, 3, false),
            Opcode::CodeCopy => fixed("CODECOPY", Ternary, 3, false),
            Opcode::ReturnDataCopy => fixed("RETURNDATACOPY", Ternary, 3, false),
            Opcode::Log1 => fixed("LOG1", Ternary, 3, false),
            Opcode::Create => fixed("CREATE", Ternary, 3, true),

            Opcode::Phi => variadic("PHI", true),
            Opcode::ExtCodeCopy => fixed("EXTCODECOPY", Nary, 4, false),
            Opcode::Log2 => fixed("LOG2", Nary, 4, false),
            Opcode::Log3 => fixed("LOG3", Nary, 5, false),
            Opcode::Log4 => fixed("LOG4", Nary, 6, false),
            // gas, address, value, argsOffset, argsSize, retOffset, retSize
            Opcode::Call => fixed("CALL", Nary, 7, true),
            Opcode::CallCode => fixed("CALLCODE", Nary, 7, true),
            // gas, address, argsOffset, argsSize, retOffset, retSize
            Opcode::DelegateCall => fixed("DELEGATECALL", Nary, 6, true),
            Opcode::Create2 => fixed("CREATE2", Nary, 4, true),
            Opcode::StaticCall => fixed("STATICCALL", Nary, 6, true),
            Opcode::CallPrivate => variadic("CALLPRIVATE", true),
            Opcode::ReturnPrivate => variadic("RETURNPRIVATE", false),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    pub fn class(self) -> ArityClass {
        self.info().class
    }

    pub fn is_variadic(self) -> bool {
        self.info().variadic
    }

    pub fn produces_value(self) -> bool {
        self.info().produces_value
    }

    /// Exact operand count (targets included) for fixed-arity opcodes
    pub fn operand_count(self) -> Option<usize> {
        let info = self.info();
        if info.variadic {
            None
        } else {
            Some(info.inputs + usize::from(info.produces_value))
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpI)
    }

    /// Case-insensitive mnemonic lookup
    pub fn from_mnemonic(word: &str) -> Option<Opcode> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(word))
    }

    /// Stream encoding of the opcode
    pub fn code(self) -> Word {
        self as Word
    }

    pub fn from_code(code: Word) -> Option<Opcode> {
        Self::ALL.get(code).copied()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Structural markers of the instruction stream
///
/// Markers share the word space with opcodes but are encoded above every
/// opcode value so the two never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Marker {
    PhiStart = 0x100,
    PhiEnd = 0x101,
    BlockEnd = 0x102,
}

impl Marker {
    pub fn code(self) -> Word {
        self as Word
    }

    pub fn from_code(code: Word) -> Option<Marker> {
        match code {
            0x100 => Some(Marker::PhiStart),
            0x101 => Some(Marker::PhiEnd),
            0x102 => Some(Marker::BlockEnd),
            _ => None,
        }
    }
}
