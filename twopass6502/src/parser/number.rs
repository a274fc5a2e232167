//! Numeric literal parsing: `$` hexadecimal or plain decimal

use super::expression::Cursor;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Hexadecimal, // $FF
    Decimal,     // 255
}

pub struct NumberParser;

impl NumberParser {
    /// Parse the literal at the cursor, returning the cursor past its last digit.
    /// Values wider than 16 bits are accepted; callers range-check on use.
    pub fn scan(c: Cursor<'_>) -> Result<(Cursor<'_>, u32), ErrorKind> {
        match Self::detect_format(c) {
            Some(NumberFormat::Hexadecimal) => {
                let (rest, digits) = c.bump().take_while(|b| b.is_ascii_hexdigit());
                Ok((rest, Self::parse_radix(digits, 16, "hexadecimal")?))
            }
            Some(NumberFormat::Decimal) => {
                let (rest, digits) = c.take_while(|b| b.is_ascii_digit());
                Ok((rest, Self::parse_radix(digits, 10, "decimal")?))
            }
            None => Err(ErrorKind::OperandSyntax(format!("expected a number at `{}`", c.rest()))),
        }
    }

    pub fn detect_format(c: Cursor<'_>) -> Option<NumberFormat> {
        match c.peek()? {
            b'$' => Some(NumberFormat::Hexadecimal),
            b if b.is_ascii_digit() => Some(NumberFormat::Decimal),
            _ => None,
        }
    }

    fn parse_radix(digits: &str, radix: u32, what: &str) -> Result<u32, ErrorKind> {
        if digits.is_empty() {
            return Err(ErrorKind::OperandSyntax(format!("missing {} digits", what)));
        }
        u32::from_str_radix(digits, radix)
            .map_err(|_| ErrorKind::OperandSyntax(format!("invalid {}: {}", what, digits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<u32, ErrorKind> {
        let (rest, value) = NumberParser::scan(Cursor::new(s))?;
        if !rest.at_end() {
            return Err(ErrorKind::OperandSyntax(format!("trailing text: {}", rest.rest())));
        }
        Ok(value)
    }

    #[test]
    fn test_hex_formats() {
        assert_eq!(parse("$FF").unwrap(), 255);
        assert_eq!(parse("$ff").unwrap(), 255);
        assert_eq!(parse("$0").unwrap(), 0);
        assert_eq!(parse("$1234").unwrap(), 0x1234);
        assert_eq!(parse("$10000").unwrap(), 0x10000);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(parse("255").unwrap(), 255);
        assert_eq!(parse("0").unwrap(), 0);
        assert_eq!(parse("65536").unwrap(), 65536);
    }

    #[test]
    fn test_invalid() {
        assert!(parse("$").is_err());
        assert!(parse("$G1").is_err());
        assert!(parse("12ab").is_err());
        assert!(parse("%1010").is_err());
        assert!(parse("$FFFFFFFFF").is_err());
    }

    #[test]
    fn test_scan_stops_after_digits() {
        let (rest, value) = NumberParser::scan(Cursor::new("$20,X")).unwrap();
        assert_eq!(value, 0x20);
        assert_eq!(rest.rest(), ",X");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(NumberParser::detect_format(Cursor::new("$FF")), Some(NumberFormat::Hexadecimal));
        assert_eq!(NumberParser::detect_format(Cursor::new("255")), Some(NumberFormat::Decimal));
        assert_eq!(NumberParser::detect_format(Cursor::new("label")), None);
    }
}
