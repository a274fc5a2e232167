//! Line tokenizer and statement classification

use super::expression::{Cursor, Expr, Operand, parse_operand, parse_value};
use crate::error::{AsmError, ErrorKind};

/// Mnemonic reported for the `*=` location directive.
pub const ORG_MNEMONIC: &str = "*";

/// One source line split into its fields. All fields empty for blank lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub label: Option<String>,
    pub mnemonic: String,
    pub operand: String,
}

impl ParsedLine {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.mnemonic.is_empty() && self.operand.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// Blank line, comment, or a bare label.
    Empty,
    Instruction { mnemonic: String, operand: Operand },
    Define { name: String, value: Expr },
    Data(Vec<Expr>), // DCB
    Org(Expr),       // *=
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub line: usize,
    pub text: String,
    pub label: Option<String>,
    pub item: Item,
}

/// Split source into numbered lines. `\n`, `\r` and `\r\n` each end a line.
pub fn split_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut rest = Some(source);
    let mut number = 0;
    std::iter::from_fn(move || {
        let text = rest?;
        number += 1;
        match text.find(['\n', '\r']) {
            Some(end) => {
                let skip = if text[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&text[end + skip..]);
                Some((number, &text[..end]))
            }
            None => {
                rest = None;
                Some((number, text))
            }
        }
    })
}

/// Split one line (no terminator) into label, mnemonic and raw operand text.
pub fn tokenize(line: &str) -> Result<ParsedLine, ErrorKind> {
    let body = line.split(';').next().unwrap_or("");
    let mut parsed = ParsedLine::default();
    let mut c = Cursor::new(body).skip_ws();

    if !c.rest().starts_with("*=") {
        let (after, word) = c.ident();
        if let Some(colon) = after.skip_ws().eat(b':') {
            if word.is_empty() {
                return Err(ErrorKind::Tokenize("label without a name".to_string()));
            }
            parsed.label = Some(word.to_string());
            c = colon.skip_ws();
        }
    }

    if let Some(rest) = c.rest().strip_prefix("*=") {
        parsed.mnemonic = ORG_MNEMONIC.to_string();
        parsed.operand = rest.to_string();
        return Ok(parsed);
    }

    let (after, mnemonic) = c.ident();
    parsed.mnemonic = mnemonic.to_string();
    parsed.operand = after.skip_ws().rest().to_string();

    if parsed.mnemonic.is_empty() && !parsed.operand.trim().is_empty() {
        return Err(ErrorKind::Tokenize(format!("expected a mnemonic at `{}`", parsed.operand.trim())));
    }
    Ok(parsed)
}

/// Turn a tokenized line into a statement, parsing its operand.
pub fn classify(parsed: ParsedLine) -> Result<(Option<String>, Item), ErrorKind> {
    let ParsedLine { label, mnemonic, operand } = parsed;

    let item = if mnemonic.is_empty() {
        Item::Empty
    } else if mnemonic == ORG_MNEMONIC {
        Item::Org(parse_value(&operand)?)
    } else if mnemonic.eq_ignore_ascii_case("DEFINE") {
        let text = operand.trim();
        let (name, value) = text
            .split_once([' ', '\t'])
            .ok_or_else(|| ErrorKind::OperandSyntax(format!("DEFINE needs a name and a value: `{}`", text)))?;
        let (rest, ident) = Cursor::new(name).ident();
        if ident.is_empty() || !rest.at_end() || name.as_bytes()[0].is_ascii_digit() {
            return Err(ErrorKind::OperandSyntax(format!("invalid constant name `{}`", name)));
        }
        Item::Define { name: name.to_string(), value: parse_value(value)? }
    } else if mnemonic.eq_ignore_ascii_case("DCB") {
        let data = operand
            .split(',')
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()?;
        Item::Data(data)
    } else {
        Item::Instruction { mnemonic, operand: parse_operand(&operand)? }
    };
    Ok((label, item))
}

/// Parse entire source into statements, one per line.
pub fn parse_source(source: &str) -> Result<Vec<SourceLine>, AsmError> {
    split_lines(source)
        .map(|(line, text)| -> Result<SourceLine, AsmError> {
            let (label, item) = tokenize(text)
                .and_then(classify)
                .map_err(|kind| AsmError::new(line, kind))?;
            Ok(SourceLine { line, text: text.to_string(), label, item })
        })
        .collect()
}
