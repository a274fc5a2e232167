//! Error types for the assembler

use thiserror::Error;

use crate::opcodes::AddressingMode;

/// A fatal assembly error, located at the 1-based source line that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    pub line: usize,
    pub kind: ErrorKind,
}

impl AsmError {
    pub fn new(line: usize, kind: ErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("malformed line: {0}")]
    Tokenize(String),

    #[error("invalid operand: {0}")]
    OperandSyntax(String),

    #[error("undefined symbol: `{0}`")]
    UnknownSymbol(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("output overflow: ${address:04X} is outside the {capacity}-byte image")]
    BufferOverflow { address: u32, capacity: usize },

    #[error("label addresses did not settle after {0} sizing passes")]
    Unstable(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unknown mnemonic: `{0}`")]
    UnknownMnemonic(String),

    #[error("{mnemonic} does not support {mode} addressing")]
    NoOpcode { mnemonic: String, mode: AddressingMode },

    #[error("branch target ${target:04X} out of range (offset {offset})")]
    BranchOutOfRange { target: u32, offset: i64 },

    #[error("value ${value:X} does not fit in {bits} bits")]
    ValueOutOfRange { value: u32, bits: u8 },

    #[error("label `{0}` defined more than once")]
    DuplicateLabel(String),
}
