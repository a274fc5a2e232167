//! Expression evaluation with symbol resolution

use crate::error::ErrorKind;
use crate::opcodes::AddressingMode;
use crate::parser::{Expr, Operand};
use crate::symbol::Scope;

/// Stand-in for a symbol that is not bound yet while sizing. Wider than any
/// 16-bit address, so it never narrows to zero page.
pub const UNRESOLVED: u32 = 0xF_FFFF;

pub struct ExpressionEvaluator<'a> {
    scope: Scope<'a>,
    deferred: bool,
}

impl<'a> ExpressionEvaluator<'a> {
    /// Unknown symbols are errors.
    pub fn new(scope: impl Into<Scope<'a>>) -> Self {
        Self { scope: scope.into(), deferred: false }
    }

    /// Unknown symbols evaluate to [`UNRESOLVED`].
    pub fn deferred(scope: impl Into<Scope<'a>>) -> Self {
        Self { scope: scope.into(), deferred: true }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<u32, ErrorKind> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Symbol(name) => match self.scope.lookup(name) {
                Some(value) => Ok(value),
                None if self.deferred => Ok(UNRESOLVED),
                None => Err(ErrorKind::UnknownSymbol(name.clone())),
            },
            Expr::LowByte(inner) => Ok(self.evaluate(inner)? & 0xFF),
            Expr::HighByte(inner) => Ok((self.evaluate(inner)? >> 8) & 0xFF),
        }
    }

    /// Final addressing mode and value of an operand. Absolute forms whose
    /// value fits in one byte narrow to their zero-page forms.
    pub fn resolve(&self, operand: &Operand) -> Result<(AddressingMode, u32), ErrorKind> {
        let value = match &operand.value {
            Some(expr) => self.evaluate(expr)?,
            None => 0,
        };
        let mode = match operand.mode.zero_page() {
            Some(zp) if value <= 0xFF => zp,
            _ => operand.mode,
        };
        Ok((mode, value))
    }
}
