//! Parser module for assembly source

pub mod expression;
pub mod lexer;
pub mod number;

pub use expression::{Expr, Operand, parse_operand};
pub use lexer::{Item, ParsedLine, SourceLine, parse_source, tokenize};
