//! Two-pass 6502 assembler and disassembler with optional human-readable
//! listing (feature: "listing")
//! - `$` hex and plain decimal literals
//! - Forward references resolved across sizing sweeps
//! - Absolute operands narrowed to zero page whenever the value fits
//!
//! ## Features
//! - **Directives**:
//!   - `*=$xxxx`: move the location counter.
//!   - `DEFINE name value`: named constant, shadows labels of the same name.
//!   - `DCB v1,v2,...`: raw bytes.
//! - **Addressing modes**: all thirteen NMOS 6502 modes. Branch targets are
//!   written as addresses or labels and encoded as relative displacements.
//! - **Byte selectors**: `<value` takes the low byte, `>value` the high byte.
//! - **Disassembly** back to the same syntax, one line per instruction.
//!
//! ## Optional Features
//! - `listing`: enables functions to print and save human-readable assembly listings.
//!
//! ## Basic Usage
//! ```rust
//! fn main() -> Result<(), twopass6502::AsmError> {
//!     let src = r#"
//!         DEFINE screen $0200
//!     start:
//!         LDA #$42
//!         STA screen
//!         BNE start
//!     "#;
//!
//!     let bytes = twopass6502::assemble(src, 0x0800, 0x100)?;
//!     assert_eq!(bytes, vec![0xA9, 0x42, 0x8D, 0x00, 0x02, 0xD0, 0xF9]);
//!
//!     let text = twopass6502::disassemble(&bytes, 0x0800);
//!     assert!(text.lines().last().unwrap().ends_with("BNE $0800"));
//!     Ok(())
//! }
//! ```
//!
//! ## License
//! This project is released under [The Unlicense](https://unlicense.org/).
//! You are free to use it for any purpose, without restriction.

mod error;
mod opcodes;
mod symbol;
mod parser;
mod eval;
mod assembler;
mod disasm;

// Public exports
pub use error::{AsmError, EncodingError, ErrorKind};
pub use opcodes::{AddressingMode, OpcodeEntry, OpcodeTable, UNDEFINED_MNEMONIC};
pub use symbol::SymbolTable;
pub use parser::{Expr, Operand, ParsedLine, parse_operand, tokenize};
pub use eval::UNRESOLVED;
pub use assembler::{AsmConfig, Assembler, LineRecord, encode, match_opcode};
pub use disasm::{DisassembledInstruction, Disassembler, disassemble};

/// Assemble `source` into an image loaded at `base_address`, at most
/// `capacity` bytes long.
pub fn assemble(source: &str, base_address: u16, capacity: usize) -> Result<Vec<u8>, AsmError> {
    Assembler::with_config(AsmConfig { base_address, capacity }).assemble(source)
}
