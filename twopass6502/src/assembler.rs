//! Main assembler implementation

#[cfg(feature = "listing")]
use std::io::{self, Write};

use crate::error::{AsmError, EncodingError, ErrorKind};
use crate::eval::ExpressionEvaluator;
use crate::opcodes::{AddressingMode, OpcodeEntry, OpcodeTable};
use crate::parser::{Item, SourceLine, parse_source};
use crate::symbol::{Scope, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsmConfig {
    /// Address the first output byte is loaded at.
    pub base_address: u16,
    /// Largest output image, in bytes.
    pub capacity: usize,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self { base_address: 0x0600, capacity: 0x10000 }
    }
}

/// What one source line produced during emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub line: usize,
    pub address: u32,
    pub bytes: Vec<u8>,
    pub text: String,
}

pub struct Assembler {
    config: AsmConfig,
    symbols: SymbolTable,
    records: Vec<LineRecord>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::with_config(AsmConfig::default())
    }

    pub fn with_config(config: AsmConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            records: Vec::new(),
        }
    }

    // ===== Public API =====

    /// Assemble one independent unit of source. Symbols from a previous run
    /// are discarded first; on error no output is produced.
    pub fn assemble(&mut self, src: &str) -> Result<Vec<u8>, AsmError> {
        self.reset();
        let lines = parse_source(src)?;
        self.symbols = self.size(&lines)?;
        let (bytes, records) = self.emit(&lines)?;
        self.records = records;
        tracing::debug!(
            "assembled {} bytes at ${:04X}, {} symbols",
            bytes.len(),
            self.config.base_address,
            self.symbols.len()
        );
        Ok(bytes)
    }

    pub fn config(&self) -> AsmConfig {
        self.config
    }

    pub fn set_origin(&mut self, addr: u16) {
        self.config.base_address = addr;
    }

    pub fn origin(&self) -> u16 {
        self.config.base_address
    }

    /// Symbols of the last successful sizing.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.symbols.lookup(name)
    }

    /// Per-line output of the last successful assembly.
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
        self.records.clear();
    }

    // ===== Sizing =====

    /// Repeat the sizing pass until label addresses stop moving. The first
    /// sweep sees forward references as unresolved; later sweeps read them
    /// from the sweep before, so a forward reference that lands in zero page
    /// is sized exactly as it will be emitted.
    fn size(&self, lines: &[SourceLine]) -> Result<SymbolTable, AsmError> {
        let limit = lines.len() + 2;
        let mut previous: Option<SymbolTable> = None;
        for sweep in 1..=limit {
            let table = self.size_sweep(lines, previous.as_ref())?;
            tracing::debug!("sizing pass {}: {} labels", sweep, table.labels().len());
            if previous.as_ref() == Some(&table) {
                return Ok(table);
            }
            previous = Some(table);
        }
        Err(AsmError::new(0, ErrorKind::Unstable(limit)))
    }

    fn size_sweep(&self, lines: &[SourceLine], previous: Option<&SymbolTable>) -> Result<SymbolTable, AsmError> {
        let mut table = SymbolTable::new();
        let mut pc = u32::from(self.config.base_address);

        for src in lines {
            let at = |kind| AsmError::new(src.line, kind);

            if let Some(label) = &src.label {
                table.insert_label(label, pc).map_err(at)?;
                tracing::trace!("{} = ${:04X}", label, pc);
            }

            match &src.item {
                Item::Empty => {}
                Item::Define { name, value } => {
                    let value = ExpressionEvaluator::deferred(Scope::new(&table, previous))
                        .evaluate(value)
                        .map_err(at)?;
                    table.define(name, value);
                }
                Item::Org(expr) => {
                    pc = ExpressionEvaluator::new(Scope::new(&table, previous))
                        .evaluate(expr)
                        .map_err(at)?;
                }
                Item::Data(values) => pc = self.advance(pc, values.len()).map_err(at)?,
                Item::Instruction { mnemonic, operand } => {
                    let (mode, value) = ExpressionEvaluator::deferred(Scope::new(&table, previous))
                        .resolve(operand)
                        .map_err(at)?;
                    let (_, entry) = match_opcode(mnemonic, mode, value).map_err(|e| at(e.into()))?;
                    pc = self.advance(pc, usize::from(entry.length)).map_err(at)?;
                }
            }
        }
        Ok(table)
    }

    /// Location counter after `len` more bytes.
    fn advance(&self, pc: u32, len: usize) -> Result<u32, ErrorKind> {
        u32::try_from(len)
            .ok()
            .and_then(|len| pc.checked_add(len))
            .ok_or(ErrorKind::BufferOverflow { address: pc, capacity: self.config.capacity })
    }

    // ===== Emission =====

    /// Same traversal as a sizing sweep, backed by the settled symbols.
    /// Constants are rebound line by line, so a redefined name reads the
    /// value it had where it is used, exactly as it was sized.
    fn emit(&self, lines: &[SourceLine]) -> Result<(Vec<u8>, Vec<LineRecord>), AsmError> {
        tracing::debug!("emission pass");
        let mut seen = SymbolTable::new();
        let mut image = Image::new(self.config);
        let mut records = Vec::with_capacity(lines.len());
        let mut pc = u32::from(self.config.base_address);

        for src in lines {
            let at = |kind| AsmError::new(src.line, kind);

            if let Some(label) = &src.label {
                seen.insert_label(label, pc).map_err(at)?;
            }

            let eval = ExpressionEvaluator::new(Scope::new(&seen, Some(&self.symbols)));
            let bytes = match &src.item {
                Item::Empty => Vec::new(),
                Item::Define { name, value } => {
                    let value = eval.evaluate(value).map_err(at)?;
                    seen.define(name, value);
                    Vec::new()
                }
                Item::Org(expr) => {
                    pc = eval.evaluate(expr).map_err(at)?;
                    Vec::new()
                }
                Item::Data(values) => values
                    .iter()
                    .map(|expr| -> Result<u8, ErrorKind> {
                        let value = eval.evaluate(expr)?;
                        u8::try_from(value).map_err(|_| EncodingError::ValueOutOfRange { value, bits: 8 }.into())
                    })
                    .collect::<Result<Vec<u8>, ErrorKind>>()
                    .map_err(at)?,
                Item::Instruction { mnemonic, operand } => {
                    let (mode, value) = eval.resolve(operand).map_err(at)?;
                    encode(mnemonic, mode, value, pc).map_err(|e| at(e.into()))?
                }
            };

            image.write(pc, &bytes).map_err(at)?;
            if !bytes.is_empty() {
                tracing::trace!("${:04X}: {:02X?}", pc, bytes);
            }
            let next = self.advance(pc, bytes.len()).map_err(at)?;
            records.push(LineRecord {
                line: src.line,
                address: pc,
                text: src.text.clone(),
                bytes,
            });
            pc = next;
        }
        Ok((image.into_bytes(), records))
    }

    // ===== Listing =====

    #[cfg(feature = "listing")]
    pub fn print_listing(&self) -> io::Result<()> {
        self.write_listing(io::stdout().lock())
    }

    #[cfg(feature = "listing")]
    pub fn write_listing<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "Address  Machine Code  Source")?;
        writeln!(w, "{}", "-".repeat(50))?;
        for record in &self.records {
            let hex = record
                .bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(w, "${:04X}    {:<12}  {}", record.address, hex, record.text.trim_end())?;
        }
        Ok(())
    }
}

/// Output buffer addressed by location counter, bounded by the configured capacity.
struct Image {
    base: u32,
    capacity: usize,
    bytes: Vec<u8>,
}

impl Image {
    fn new(config: AsmConfig) -> Self {
        Self {
            base: u32::from(config.base_address),
            capacity: config.capacity,
            bytes: Vec::new(),
        }
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), ErrorKind> {
        if data.is_empty() {
            return Ok(());
        }
        let overflow = ErrorKind::BufferOverflow { address, capacity: self.capacity };
        let offset = address.checked_sub(self.base).ok_or(overflow.clone())? as usize;
        let end = match offset.checked_add(data.len()) {
            Some(end) if end <= self.capacity => end,
            _ => return Err(overflow),
        };
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ===== Instruction matching =====

/// Pick the opcode for `mnemonic` given the operand's resolved mode and value.
///
/// A bare address becomes a branch displacement for branch mnemonics, a
/// missing operand selects the accumulator form of shifts, and zero-page and
/// absolute forms stand in for each other: zero page first when the value
/// fits, absolute otherwise.
pub fn match_opcode(
    mnemonic: &str,
    mode: AddressingMode,
    value: u32,
) -> Result<(u8, &'static OpcodeEntry), EncodingError> {
    use AddressingMode::*;

    let table = OpcodeTable::get();
    if !table.is_mnemonic(mnemonic) {
        return Err(EncodingError::UnknownMnemonic(mnemonic.to_string()));
    }

    let candidates: Vec<AddressingMode> = match mode {
        Absolute | ZeroPage if table.has_mode(mnemonic, Relative) => vec![Relative],
        Implied if table.has_mode(mnemonic, Accumulator) => vec![Accumulator],
        _ => match zp_abs_pair(mode) {
            Some((zp, abs)) if value <= 0xFF => vec![zp, abs],
            Some((_, abs)) => vec![abs],
            None => vec![mode],
        },
    };

    candidates
        .into_iter()
        .find_map(|m| table.find(mnemonic, m))
        .map(|byte| (byte, table.lookup_by_byte(byte)))
        .ok_or_else(|| EncodingError::NoOpcode {
            mnemonic: mnemonic.to_ascii_uppercase(),
            mode,
        })
}

fn zp_abs_pair(mode: AddressingMode) -> Option<(AddressingMode, AddressingMode)> {
    match (mode.zero_page(), mode.absolute()) {
        (Some(zp), None) => Some((zp, mode)),
        (None, Some(abs)) => Some((mode, abs)),
        _ => None,
    }
}

/// Opcode and little-endian operand bytes for an instruction at `pc`.
pub fn encode(mnemonic: &str, mode: AddressingMode, value: u32, pc: u32) -> Result<Vec<u8>, EncodingError> {
    let (opcode, entry) = match_opcode(mnemonic, mode, value)?;
    let mut bytes = Vec::with_capacity(entry.length as usize);
    bytes.push(opcode);

    if entry.mode == AddressingMode::Relative {
        let offset = i64::from(value) - (i64::from(pc) + 2);
        if !(-128..=127).contains(&offset) {
            return Err(EncodingError::BranchOutOfRange { target: value, offset });
        }
        bytes.push(offset as i8 as u8);
        return Ok(bytes);
    }

    match entry.length {
        2 => {
            let byte = u8::try_from(value).map_err(|_| EncodingError::ValueOutOfRange { value, bits: 8 })?;
            bytes.push(byte);
        }
        3 => {
            let word = u16::try_from(value).map_err(|_| EncodingError::ValueOutOfRange { value, bits: 16 })?;
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        _ => {}
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_at(base: u16, src: &str) -> Result<Vec<u8>, AsmError> {
        Assembler::with_config(AsmConfig { base_address: base, capacity: 0x10000 - base as usize }).assemble(src)
    }

    fn zeros(n: usize) -> String {
        format!("DCB {}", vec!["0"; n].join(","))
    }

    #[test]
    fn test_noise_loop() {
        let src = "start: LDY #$FF\nLDX #$00\nloop: LDA $FE\nINX\nDEY\nBNE loop\nRTS";
        let bytes = assemble_at(0x0600, src).unwrap();
        assert_eq!(bytes, vec![0xA0, 0xFF, 0xA2, 0x00, 0xA5, 0xFE, 0xE8, 0x88, 0xD0, 0xFA, 0x60]);
    }

    #[test]
    fn test_zero_page_narrowing() {
        assert_eq!(assemble_at(0x0600, "LDA $0A").unwrap(), vec![0xA5, 0x0A]);
        assert_eq!(assemble_at(0x0600, "LDA $000A").unwrap(), vec![0xA5, 0x0A]);
        assert_eq!(assemble_at(0x0600, "LDA $0100").unwrap(), vec![0xAD, 0x00, 0x01]);
        assert_eq!(assemble_at(0x0600, "STX $10,Y").unwrap(), vec![0x96, 0x10]);
    }

    #[test]
    fn test_zero_page_falls_back_to_absolute() {
        assert_eq!(assemble_at(0x0600, "JMP $0010").unwrap(), vec![0x4C, 0x10, 0x00]);
        assert_eq!(assemble_at(0x0600, "LDA $10,Y").unwrap(), vec![0xB9, 0x10, 0x00]);
        assert_eq!(assemble_at(0x0600, "JSR 128").unwrap(), vec![0x20, 0x80, 0x00]);
    }

    #[test]
    fn test_forward_branch() {
        let src = format!("BNE ahead\n{}\nahead: RTS", zeros(10));
        let bytes = assemble_at(0x0600, &src).unwrap();
        assert_eq!(&bytes[..2], &[0xD0, 0x0A]);
        assert_eq!(bytes.len(), 13);
    }

    #[test]
    fn test_forward_and_backward_reference_agree() {
        let forward = assemble_at(0x0600, "JMP there\nthere: NOP").unwrap();
        let backward = assemble_at(0x0600, "DEFINE there $0603\nJMP there\nNOP").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![0x4C, 0x03, 0x06, 0xEA]);
    }

    #[test]
    fn test_branch_range() {
        let ok = format!("BNE far\n{}\nfar: RTS", zeros(127));
        assert_eq!(&assemble_at(0x0600, &ok).unwrap()[..2], &[0xD0, 0x7F]);

        let too_far = format!("BNE far\n{}\nfar: RTS", zeros(128));
        let err = assemble_at(0x0600, &too_far).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::BranchOutOfRange { offset: 128, .. })));

        let back_ok = format!("back: {}\nBEQ back", zeros(126));
        let bytes = assemble_at(0x0600, &back_ok).unwrap();
        assert_eq!(&bytes[126..], &[0xF0, 0x80]);

        let back_far = format!("back: {}\nBEQ back", zeros(127));
        let err = assemble_at(0x0600, &back_far).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::BranchOutOfRange { offset: -129, .. })));
    }

    #[test]
    fn test_branch_to_zero_page_target() {
        let bytes = assemble_at(0x0000, "loop: NOP\nBNE loop").unwrap();
        assert_eq!(bytes, vec![0xEA, 0xD0, 0xFD]);
    }

    #[test]
    fn test_accumulator_shifts() {
        assert_eq!(assemble_at(0x0600, "ASL\nLSR A\nrol a\nROR").unwrap(), vec![0x0A, 0x4A, 0x2A, 0x6A]);
    }

    #[test]
    fn test_define_shadows_label() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("DEFINE foo 5\nfoo: LDA #foo").unwrap();
        assert_eq!(bytes, vec![0xA9, 0x05]);
        assert_eq!(asm.lookup("foo"), Some(5));
        assert_eq!(asm.symbols().get_label("foo"), Some(0x0600));
    }

    #[test]
    fn test_define_last_write_wins() {
        let bytes = assemble_at(0x0600, "DEFINE c 1\nDEFINE c 2\nLDA #c").unwrap();
        assert_eq!(bytes, vec![0xA9, 0x02]);
    }

    #[test]
    fn test_redefined_constant_keeps_its_size() {
        // First use sized as zero page must stay zero page once `c` is rebound.
        let mut asm = Assembler::new();
        let bytes = asm.assemble("DEFINE c 1\nLDA c\nfoo: NOP\nDEFINE c $1234\nJMP foo").unwrap();
        assert_eq!(bytes, vec![0xA5, 0x01, 0xEA, 0x4C, 0x02, 0x06]);
        assert_eq!(asm.lookup("foo"), Some(0x0602));
        assert_eq!(asm.lookup("c"), Some(0x1234));

        let bytes = assemble_at(0x0600, "DEFINE c $1234\nLDA c\nDEFINE c 1\nLDA c").unwrap();
        assert_eq!(bytes, vec![0xAD, 0x34, 0x12, 0xA5, 0x01]);
    }

    #[test]
    fn test_byte_selectors() {
        let src = "DEFINE screen $0400\nLDA #<screen\nLDX #>screen\nmsg: DCB <msg, >msg";
        assert_eq!(assemble_at(0x0600, src).unwrap(), vec![0xA9, 0x00, 0xA2, 0x04, 0x04, 0x06]);
    }

    #[test]
    fn test_location_reset() {
        let mut asm = Assembler::with_config(AsmConfig { base_address: 0x0200, capacity: 0x1000 });
        let bytes = asm.assemble("LDA #1\n*=$0400\nhere: NOP").unwrap();
        assert_eq!(asm.lookup("here"), Some(0x0400));
        assert_eq!(bytes.len(), 0x201);
        assert_eq!(&bytes[..2], &[0xA9, 0x01]);
        assert!(bytes[2..0x200].iter().all(|&b| b == 0));
        assert_eq!(bytes[0x200], 0xEA);
    }

    #[test]
    fn test_forward_reference_into_zero_page() {
        // Sized as absolute on the first sweep, settles on zero page.
        let mut asm = Assembler::with_config(AsmConfig { base_address: 0x0000, capacity: 0x100 });
        let bytes = asm.assemble("LDA data\nRTS\ndata: DCB $2A").unwrap();
        assert_eq!(bytes, vec![0xA5, 0x03, 0x60, 0x2A]);
        assert_eq!(asm.lookup("data"), Some(0x03));
    }

    #[test]
    fn test_fresh_state_between_runs() {
        let mut asm = Assembler::new();
        asm.assemble("stale: NOP").unwrap();
        let err = asm.assemble("JMP stale").unwrap_err();
        assert_eq!(err, AsmError::new(1, ErrorKind::UnknownSymbol("stale".to_string())));
        assert!(asm.symbols().is_empty());
    }

    #[test]
    fn test_duplicate_label() {
        let err = assemble_at(0x0600, "a: NOP\nA: NOP").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::DuplicateLabel(_))));
    }

    #[test]
    fn test_buffer_overflow() {
        let mut asm = Assembler::with_config(AsmConfig { base_address: 0x0600, capacity: 4 });
        let err = asm.assemble("LDA #1\nLDA $1234").unwrap_err();
        assert_eq!(err, AsmError::new(2, ErrorKind::BufferOverflow { address: 0x0602, capacity: 4 }));

        let err = assemble_at(0x0600, "*=$0500\nNOP").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BufferOverflow { address: 0x0500, .. }));
    }

    #[test]
    fn test_location_counter_overflow() {
        let err = Assembler::new().assemble("*=$FFFFFFFF\nNOP").unwrap_err();
        assert_eq!(err, AsmError::new(2, ErrorKind::BufferOverflow { address: 0xFFFF_FFFF, capacity: 0x10000 }));

        let err = Assembler::new().assemble("*=$FFFFFFFE\nDCB 1,2,3").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ErrorKind::BufferOverflow { .. }));
    }

    #[test]
    fn test_encoding_errors() {
        let err = assemble_at(0x0600, "FOO #1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Encoding(EncodingError::UnknownMnemonic("FOO".to_string())));

        let err = assemble_at(0x0600, "NOP\nSTA #$10").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(
            err.kind,
            ErrorKind::Encoding(EncodingError::NoOpcode { mode: AddressingMode::Immediate, .. })
        ));

        let err = assemble_at(0x0600, "LDA").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::NoOpcode { .. })));
    }

    #[test]
    fn test_value_out_of_range() {
        let err = assemble_at(0x0600, "LDA #256").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Encoding(EncodingError::ValueOutOfRange { value: 256, bits: 8 }));

        let err = assemble_at(0x0600, "DEFINE big $10000\nLDA big").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::ValueOutOfRange { bits: 16, .. })));

        let err = assemble_at(0x0600, "DCB 1, 300").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Encoding(EncodingError::ValueOutOfRange { value: 300, .. })));
    }

    #[test]
    fn test_undefined_symbol_is_reported_at_emission() {
        let err = assemble_at(0x0600, "NOP\nLDA missing,X").unwrap_err();
        assert_eq!(err, AsmError::new(2, ErrorKind::UnknownSymbol("missing".to_string())));

        let err = assemble_at(0x0600, "NOP\nDEFINE size missing").unwrap_err();
        assert_eq!(err, AsmError::new(2, ErrorKind::UnknownSymbol("missing".to_string())));
    }

    #[test]
    fn test_define_may_reference_later_label() {
        let bytes = assemble_at(0x0600, "DEFINE entry main\nJMP entry\nmain: RTS").unwrap();
        assert_eq!(bytes, vec![0x4C, 0x03, 0x06, 0x60]);
    }

    #[test]
    fn test_records() {
        let mut asm = Assembler::new();
        asm.assemble("; header\nstart: LDA #1\n  STA $0200").unwrap();
        let records = asm.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].address, 0x0600);
        assert_eq!(records[1].bytes, vec![0xA9, 0x01]);
        assert_eq!(records[2].address, 0x0602);
        assert_eq!(records[2].text, "  STA $0200");
    }

    #[test]
    fn test_match_opcode_candidates() {
        use AddressingMode::*;
        assert_eq!(match_opcode("bcc", Absolute, 0x0700).unwrap().0, 0x90);
        assert_eq!(match_opcode("LDX", ZeroPageY, 0x10).unwrap().0, 0xB6);
        assert_eq!(match_opcode("LDX", AbsoluteY, 0x10).unwrap().0, 0xB6);
        assert_eq!(match_opcode("LDX", AbsoluteY, 0x1000).unwrap().0, 0xBE);
        assert_eq!(match_opcode("LDA", AbsoluteX, crate::eval::UNRESOLVED).unwrap().1.length, 3);
    }

    #[cfg(feature = "listing")]
    #[test]
    fn test_write_listing() {
        let mut asm = Assembler::new();
        asm.assemble("loop: DEX\n BNE loop").unwrap();
        let mut out = Vec::new();
        asm.write_listing(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("$0600    {:<12}  loop: DEX", "CA")));
        assert!(text.contains(&format!("$0601    {:<12}   BNE loop", "D0 FD")));
    }
}
