//! Operand grammar: value expressions and addressing-mode syntax

use super::number::NumberParser;
use crate::error::ErrorKind;
use crate::opcodes::AddressingMode;

/// Read position over ASCII source text. Productions take a cursor by value
/// and hand back the cursor advanced past what they consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Advance one byte (no-op at the end).
    pub fn bump(self) -> Self {
        Self { pos: (self.pos + 1).min(self.src.len()), ..self }
    }

    pub fn skip_ws(self) -> Self {
        self.take_while(|b| b == b' ' || b == b'\t').0
    }

    pub fn eat(self, expected: u8) -> Option<Self> {
        (self.peek() == Some(expected)).then(|| self.bump())
    }

    pub fn take_while(self, pred: impl Fn(u8) -> bool) -> (Self, &'a str) {
        let bytes = self.src.as_bytes();
        let mut end = self.pos;
        while end < bytes.len() && pred(bytes[end]) {
            end += 1;
        }
        (Self { pos: end, ..self }, &self.src[self.pos..end])
    }

    /// Letters, digits and underscore. Empty when the cursor is not on one.
    pub fn ident(self) -> (Self, &'a str) {
        self.take_while(is_ident_byte)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(u32),
    Symbol(String),
    LowByte(Box<Expr>),  // <value
    HighByte(Box<Expr>), // >value
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub mode: AddressingMode,
    /// Absent for implied and accumulator operands.
    pub value: Option<Expr>,
}

impl Operand {
    fn bare(mode: AddressingMode) -> Self {
        Self { mode, value: None }
    }

    fn with(mode: AddressingMode, value: Expr) -> Self {
        Self { mode, value: Some(value) }
    }
}

type Parsed<'a, T> = Result<(Cursor<'a>, T), ErrorKind>;

fn syntax(msg: impl Into<String>) -> ErrorKind {
    ErrorKind::OperandSyntax(msg.into())
}

/// Parse operand text into its addressing mode and value expression.
/// Mode here is syntactic; zero-page narrowing happens once the value is known.
pub fn parse_operand(text: &str) -> Result<Operand, ErrorKind> {
    let c = Cursor::new(text).skip_ws();
    if c.at_end() {
        return Ok(Operand::bare(AddressingMode::Implied));
    }
    if c.rest().trim_end().eq_ignore_ascii_case("A") {
        return Ok(Operand::bare(AddressingMode::Accumulator));
    }

    let (c, operand) = match c.peek() {
        Some(b'#') => {
            let (c, value) = value(c.bump().skip_ws())?;
            (c, Operand::with(AddressingMode::Immediate, value))
        }
        Some(b'(') => indirect(c.bump().skip_ws())?,
        _ => absolute(c)?,
    };

    finish(c, text)?;
    Ok(operand)
}

/// Parse text holding exactly one value expression (directive arguments).
pub fn parse_value(text: &str) -> Result<Expr, ErrorKind> {
    let (c, expr) = value(Cursor::new(text).skip_ws())?;
    finish(c, text)?;
    Ok(expr)
}

fn finish(c: Cursor<'_>, text: &str) -> Result<(), ErrorKind> {
    let c = c.skip_ws();
    if c.at_end() {
        Ok(())
    } else {
        Err(syntax(format!("unexpected `{}` in `{}`", c.rest(), text.trim())))
    }
}

fn indirect(c: Cursor<'_>) -> Parsed<'_, Operand> {
    let (c, value) = value(c)?;
    let c = c.skip_ws();

    if let Some(c) = c.eat(b')') {
        // ($nn),Y or ($nnnn)
        let after = c.skip_ws();
        return match after.eat(b',') {
            Some(comma) => match register(comma.skip_ws()) {
                Some((c, b'Y')) => Ok((c, Operand::with(AddressingMode::IndirectY, value))),
                _ => Err(syntax("only `,Y` may follow `)`")),
            },
            None => Ok((c, Operand::with(AddressingMode::Indirect, value))),
        };
    }

    // ($nn,X)
    let comma = c.eat(b',').ok_or_else(|| syntax("expected `)` or `,X`"))?;
    match register(comma.skip_ws()) {
        Some((c, b'X')) => {
            let c = c.skip_ws().eat(b')').ok_or_else(|| syntax("expected `)` after `,X`"))?;
            Ok((c, Operand::with(AddressingMode::IndirectX, value)))
        }
        _ => Err(syntax("only `,X` may appear inside parentheses")),
    }
}

fn absolute(c: Cursor<'_>) -> Parsed<'_, Operand> {
    let (c, value) = value(c)?;
    let after = c.skip_ws();
    let Some(comma) = after.eat(b',') else {
        return Ok((c, Operand::with(AddressingMode::Absolute, value)));
    };
    match register(comma.skip_ws()) {
        Some((c, b'X')) => Ok((c, Operand::with(AddressingMode::AbsoluteX, value))),
        Some((c, b'Y')) => Ok((c, Operand::with(AddressingMode::AbsoluteY, value))),
        _ => Err(syntax("expected `X` or `Y` after `,`")),
    }
}

/// Index register letter, upper-cased.
fn register(c: Cursor<'_>) -> Option<(Cursor<'_>, u8)> {
    let reg = c.peek()?.to_ascii_uppercase();
    matches!(reg, b'X' | b'Y').then(|| (c.bump(), reg))
}

fn value(c: Cursor<'_>) -> Parsed<'_, Expr> {
    match c.peek() {
        Some(b'<') => {
            let (c, inner) = primary(c.bump().skip_ws())?;
            Ok((c, Expr::LowByte(Box::new(inner))))
        }
        Some(b'>') => {
            let (c, inner) = primary(c.bump().skip_ws())?;
            Ok((c, Expr::HighByte(Box::new(inner))))
        }
        _ => primary(c),
    }
}

fn primary(c: Cursor<'_>) -> Parsed<'_, Expr> {
    if NumberParser::detect_format(c).is_some() {
        let (c, n) = NumberParser::scan(c)?;
        return Ok((c, Expr::Number(n)));
    }
    let (next, name) = c.ident();
    if name.is_empty() {
        let found = if c.at_end() { "end of operand".to_string() } else { format!("`{}`", c.rest()) };
        return Err(syntax(format!("expected a value, found {}", found)));
    }
    Ok((next, Expr::Symbol(name.to_string())))
}
