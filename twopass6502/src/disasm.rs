//! Disassembler: machine code back to mnemonic text

use std::fmt;

use crate::opcodes::{AddressingMode, OpcodeTable, UNDEFINED_MNEMONIC};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembledInstruction {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    /// Operand value; for branches, the absolute target address.
    pub operand: u16,
}

impl DisassembledInstruction {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn operand_text(&self) -> String {
        use AddressingMode::*;
        let v = self.operand;
        match self.mode {
            Undefined | Implied => String::new(),
            Accumulator => "A".to_string(),
            Immediate => format!("#${:02X}", v),
            ZeroPage => format!("${:02X}", v),
            ZeroPageX => format!("${:02X},X", v),
            ZeroPageY => format!("${:02X},Y", v),
            Relative | Absolute => format!("${:04X}", v),
            AbsoluteX => format!("${:04X},X", v),
            AbsoluteY => format!("${:04X},Y", v),
            Indirect => format!("(${:04X})", v),
            IndirectX => format!("(${:02X},X)", v),
            IndirectY => format!("(${:02X}),Y", v),
        }
    }
}

impl fmt::Display for DisassembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operand = self.operand_text();
        if operand.is_empty() {
            f.write_str(self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, operand)
        }
    }
}

/// Walks a byte buffer one instruction at a time. Never fails: bytes that do
/// not start a complete instruction come out as one-byte `???`.
pub struct Disassembler<'a> {
    bytes: &'a [u8],
    offset: usize,
    base: u16,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytes: &'a [u8], base: u16) -> Self {
        Self { bytes, offset: 0, base }
    }
}

impl Iterator for Disassembler<'_> {
    type Item = DisassembledInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        let opcode = *self.bytes.get(self.offset)?;
        let address = self.base.wrapping_add(self.offset as u16);
        let entry = OpcodeTable::get().lookup_by_byte(opcode);
        let len = entry.length as usize;

        let Some(bytes) = self.bytes.get(self.offset..self.offset + len) else {
            self.offset += 1;
            return Some(DisassembledInstruction {
                address,
                bytes: vec![opcode],
                mnemonic: UNDEFINED_MNEMONIC,
                mode: AddressingMode::Undefined,
                operand: 0,
            });
        };
        self.offset += len;

        let operand = match (entry.mode, bytes) {
            (AddressingMode::Relative, &[_, disp]) => {
                address.wrapping_add(2).wrapping_add_signed(i16::from(disp as i8))
            }
            (_, &[_, lo]) => u16::from(lo),
            (_, &[_, lo, hi]) => u16::from_le_bytes([lo, hi]),
            _ => 0,
        };

        Some(DisassembledInstruction {
            address,
            bytes: bytes.to_vec(),
            mnemonic: entry.mnemonic,
            mode: entry.mode,
            operand,
        })
    }
}

/// One line per instruction: address, raw bytes, mnemonic and operand.
pub fn disassemble(bytes: &[u8], base_address: u16) -> String {
    let mut out = String::new();
    for inst in Disassembler::new(bytes, base_address) {
        let hex = inst
            .bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!("{:04X}    {:<12}{}\n", inst.address, hex, inst));
    }
    out
}
