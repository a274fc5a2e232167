//! 6502 opcode table and addressing modes

use std::fmt;

use once_cell::sync::Lazy;

/// Mnemonic printed for bytes that are not NMOS 6502 instructions.
pub const UNDEFINED_MNEMONIC: &str = "???";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Undefined,
    Accumulator,
    Implied,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

impl AddressingMode {
    /// Encoded length of an instruction using this mode, opcode included.
    pub fn instruction_len(self) -> u8 {
        use AddressingMode::*;
        match self {
            Undefined | Accumulator | Implied => 1,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndirectX | IndirectY => 2,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 3,
        }
    }

    /// Zero-page counterpart of an absolute mode.
    pub fn zero_page(self) -> Option<AddressingMode> {
        match self {
            AddressingMode::Absolute => Some(AddressingMode::ZeroPage),
            AddressingMode::AbsoluteX => Some(AddressingMode::ZeroPageX),
            AddressingMode::AbsoluteY => Some(AddressingMode::ZeroPageY),
            _ => None,
        }
    }

    /// Absolute counterpart of a zero-page mode.
    pub fn absolute(self) -> Option<AddressingMode> {
        match self {
            AddressingMode::ZeroPage => Some(AddressingMode::Absolute),
            AddressingMode::ZeroPageX => Some(AddressingMode::AbsoluteX),
            AddressingMode::ZeroPageY => Some(AddressingMode::AbsoluteY),
            _ => None,
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressingMode::Undefined => "undefined",
            AddressingMode::Accumulator => "accumulator",
            AddressingMode::Implied => "implied",
            AddressingMode::Immediate => "immediate",
            AddressingMode::ZeroPage => "zeropage",
            AddressingMode::ZeroPageX => "zeropage,X",
            AddressingMode::ZeroPageY => "zeropage,Y",
            AddressingMode::Relative => "relative",
            AddressingMode::Absolute => "absolute",
            AddressingMode::AbsoluteX => "absolute,X",
            AddressingMode::AbsoluteY => "absolute,Y",
            AddressingMode::Indirect => "indirect",
            AddressingMode::IndirectX => "indirect,X",
            AddressingMode::IndirectY => "indirect,Y",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub mnemonic: &'static str,
    pub length: u8,
    pub mode: AddressingMode,
}

impl OpcodeEntry {
    const UNDEFINED: OpcodeEntry = OpcodeEntry {
        mnemonic: UNDEFINED_MNEMONIC,
        length: 1,
        mode: AddressingMode::Undefined,
    };

    pub fn is_defined(&self) -> bool {
        self.mode != AddressingMode::Undefined
    }
}

pub struct OpcodeTable {
    entries: [OpcodeEntry; 256],
}

static TABLE: Lazy<OpcodeTable> = Lazy::new(OpcodeTable::build);

impl OpcodeTable {
    /// The process-wide table. Built on first use and read-only afterwards.
    pub fn get() -> &'static OpcodeTable {
        &TABLE
    }

    fn build() -> Self {
        use AddressingMode::*;

        let mut entries = [OpcodeEntry::UNDEFINED; 256];
        let defined: &[(u8, &'static str, AddressingMode)] = &[
            (0x69, "ADC", Immediate), (0x65, "ADC", ZeroPage), (0x75, "ADC", ZeroPageX),
            (0x6D, "ADC", Absolute), (0x7D, "ADC", AbsoluteX), (0x79, "ADC", AbsoluteY),
            (0x61, "ADC", IndirectX), (0x71, "ADC", IndirectY),
            (0x29, "AND", Immediate), (0x25, "AND", ZeroPage), (0x35, "AND", ZeroPageX),
            (0x2D, "AND", Absolute), (0x3D, "AND", AbsoluteX), (0x39, "AND", AbsoluteY),
            (0x21, "AND", IndirectX), (0x31, "AND", IndirectY),
            (0x0A, "ASL", Accumulator), (0x06, "ASL", ZeroPage), (0x16, "ASL", ZeroPageX),
            (0x0E, "ASL", Absolute), (0x1E, "ASL", AbsoluteX),
            (0x24, "BIT", ZeroPage), (0x2C, "BIT", Absolute),
            (0x00, "BRK", Implied),
            (0xC9, "CMP", Immediate), (0xC5, "CMP", ZeroPage), (0xD5, "CMP", ZeroPageX),
            (0xCD, "CMP", Absolute), (0xDD, "CMP", AbsoluteX), (0xD9, "CMP", AbsoluteY),
            (0xC1, "CMP", IndirectX), (0xD1, "CMP", IndirectY),
            (0xE0, "CPX", Immediate), (0xE4, "CPX", ZeroPage), (0xEC, "CPX", Absolute),
            (0xC0, "CPY", Immediate), (0xC4, "CPY", ZeroPage), (0xCC, "CPY", Absolute),
            (0xC6, "DEC", ZeroPage), (0xD6, "DEC", ZeroPageX),
            (0xCE, "DEC", Absolute), (0xDE, "DEC", AbsoluteX),
            (0x49, "EOR", Immediate), (0x45, "EOR", ZeroPage), (0x55, "EOR", ZeroPageX),
            (0x4D, "EOR", Absolute), (0x5D, "EOR", AbsoluteX), (0x59, "EOR", AbsoluteY),
            (0x41, "EOR", IndirectX), (0x51, "EOR", IndirectY),
            (0xE6, "INC", ZeroPage), (0xF6, "INC", ZeroPageX),
            (0xEE, "INC", Absolute), (0xFE, "INC", AbsoluteX),
            (0x4C, "JMP", Absolute), (0x6C, "JMP", Indirect),
            (0x20, "JSR", Absolute),
            (0xA9, "LDA", Immediate), (0xA5, "LDA", ZeroPage), (0xB5, "LDA", ZeroPageX),
            (0xAD, "LDA", Absolute), (0xBD, "LDA", AbsoluteX), (0xB9, "LDA", AbsoluteY),
            (0xA1, "LDA", IndirectX), (0xB1, "LDA", IndirectY),
            (0xA2, "LDX", Immediate), (0xA6, "LDX", ZeroPage), (0xB6, "LDX", ZeroPageY),
            (0xAE, "LDX", Absolute), (0xBE, "LDX", AbsoluteY),
            (0xA0, "LDY", Immediate), (0xA4, "LDY", ZeroPage), (0xB4, "LDY", ZeroPageX),
            (0xAC, "LDY", Absolute), (0xBC, "LDY", AbsoluteX),
            (0x4A, "LSR", Accumulator), (0x46, "LSR", ZeroPage), (0x56, "LSR", ZeroPageX),
            (0x4E, "LSR", Absolute), (0x5E, "LSR", AbsoluteX),
            (0xEA, "NOP", Implied),
            (0x09, "ORA", Immediate), (0x05, "ORA", ZeroPage), (0x15, "ORA", ZeroPageX),
            (0x0D, "ORA", Absolute), (0x1D, "ORA", AbsoluteX), (0x19, "ORA", AbsoluteY),
            (0x01, "ORA", IndirectX), (0x11, "ORA", IndirectY),
            (0x2A, "ROL", Accumulator), (0x26, "ROL", ZeroPage), (0x36, "ROL", ZeroPageX),
            (0x2E, "ROL", Absolute), (0x3E, "ROL", AbsoluteX),
            (0x6A, "ROR", Accumulator), (0x66, "ROR", ZeroPage), (0x76, "ROR", ZeroPageX),
            (0x6E, "ROR", Absolute), (0x7E, "ROR", AbsoluteX),
            (0x40, "RTI", Implied), (0x60, "RTS", Implied),
            (0xE9, "SBC", Immediate), (0xE5, "SBC", ZeroPage), (0xF5, "SBC", ZeroPageX),
            (0xED, "SBC", Absolute), (0xFD, "SBC", AbsoluteX), (0xF9, "SBC", AbsoluteY),
            (0xE1, "SBC", IndirectX), (0xF1, "SBC", IndirectY),
            (0x85, "STA", ZeroPage), (0x95, "STA", ZeroPageX),
            (0x8D, "STA", Absolute), (0x9D, "STA", AbsoluteX), (0x99, "STA", AbsoluteY),
            (0x81, "STA", IndirectX), (0x91, "STA", IndirectY),
            (0x86, "STX", ZeroPage), (0x96, "STX", ZeroPageY), (0x8E, "STX", Absolute),
            (0x84, "STY", ZeroPage), (0x94, "STY", ZeroPageX), (0x8C, "STY", Absolute),
            (0x10, "BPL", Relative), (0x30, "BMI", Relative), (0x50, "BVC", Relative),
            (0x70, "BVS", Relative), (0x90, "BCC", Relative), (0xB0, "BCS", Relative),
            (0xD0, "BNE", Relative), (0xF0, "BEQ", Relative),
            (0xAA, "TAX", Implied), (0x8A, "TXA", Implied), (0xCA, "DEX", Implied),
            (0xE8, "INX", Implied), (0xA8, "TAY", Implied), (0x98, "TYA", Implied),
            (0x88, "DEY", Implied), (0xC8, "INY", Implied),
            (0x18, "CLC", Implied), (0x38, "SEC", Implied), (0x58, "CLI", Implied),
            (0x78, "SEI", Implied), (0xB8, "CLV", Implied), (0xD8, "CLD", Implied),
            (0xF8, "SED", Implied),
            (0x9A, "TXS", Implied), (0xBA, "TSX", Implied),
            (0x48, "PHA", Implied), (0x68, "PLA", Implied),
            (0x08, "PHP", Implied), (0x28, "PLP", Implied),
        ];

        for &(byte, mnemonic, mode) in defined {
            entries[byte as usize] = OpcodeEntry {
                mnemonic,
                length: mode.instruction_len(),
                mode,
            };
        }
        Self { entries }
    }

    pub fn lookup_by_byte(&self, byte: u8) -> &OpcodeEntry {
        &self.entries[byte as usize]
    }

    /// Opcode byte for `mnemonic` (any case) in exactly `mode`.
    pub fn find(&self, mnemonic: &str, mode: AddressingMode) -> Option<u8> {
        if mode == AddressingMode::Undefined {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.mode == mode && e.mnemonic.eq_ignore_ascii_case(mnemonic))
            .map(|i| i as u8)
    }

    pub fn has_mode(&self, mnemonic: &str, mode: AddressingMode) -> bool {
        self.find(mnemonic, mode).is_some()
    }

    pub fn is_mnemonic(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.is_defined() && e.mnemonic.eq_ignore_ascii_case(name))
    }

    /// Defined opcodes in byte order.
    pub fn entries(&self) -> impl Iterator<Item = (u8, &OpcodeEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_defined())
            .map(|(i, e)| (i as u8, e))
    }
}
