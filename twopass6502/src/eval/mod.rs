//! Operand evaluation against the symbol tables

pub mod expression;

pub use expression::{ExpressionEvaluator, UNRESOLVED};
