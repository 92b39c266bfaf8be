//! Error types for expression compilation and evaluation.

use thiserror::Error;

/// Errors that can occur compiling or evaluating an expression.
#[derive(Error, Debug)]
pub enum ExprError {
    /// Unrecognized value token or operator glyph.
    #[error("tokenize error: {0}")]
    Tokenize(String),

    /// Structurally invalid expression (unmatched parenthesis, missing
    /// operand, stray symbols after reduction, ...).
    #[error("parse error: {0}")]
    Parse(String),

    /// Operation applied to operands it cannot accept (e.g. a bitwise
    /// operator over a floating-point operand).
    #[error("type error: {0}")]
    Type(String),

    /// Identifier is neither a field, alias, reserved name, number, nor
    /// function keyword.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// Runtime evaluation failure.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// Histogram construction or filling error.
    #[error("histogram error: {0}")]
    Histogram(String),
}

/// Result alias for expression operations.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Two-line diagnostic with a caret pointing at the offending column.
pub(crate) fn caret_diagnostic(expr: &str, col: usize) -> String {
    let mut out = format!("cannot parse expression \"{expr}\"\n");
    out.push_str(&" ".repeat("cannot parse expression \"".len() + col));
    out.push('^');
    out
}
