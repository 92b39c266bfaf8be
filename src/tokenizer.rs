//! Tokenizer: splits an expression string into a flat symbol list,
//! classifying value tokens against the bound record source.
//!
//! The scan is byte-oriented and left-to-right. Operator characters
//! open an operator token (longest match); anything else opens a value
//! token, which runs to the next operator character or whitespace. A
//! value token that fails to classify is retried with the substring
//! ending before its rightmost `+`/`-`, so `1e5-3` splits into a
//! literal and a binary minus. A sign left over in unary position is
//! emitted as an operator symbol for the parser's unary phase.

use crate::error::{caret_diagnostic, ExprError, Result};
use crate::node::{FieldRef, Node};
use crate::record::RecordSource;
use crate::symbol::{Func, Op, Symbol};
use crate::value::Value;

/// Characters that terminate a value token and open an operator token.
const OPERATOR_CHARS: &[u8] = b",/*%^)(=><&|!~";

/// Characters an operator token may continue with; parens stand alone.
const OPERATOR_RUN_CHARS: &[u8] = b",/*%^=><&|!~";

pub(crate) struct Tokenizer<'a> {
    src: &'a str,
    source: &'a dyn RecordSource,
    pos: usize,
    symbols: Vec<Symbol>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str, source: &'a dyn RecordSource) -> Self {
        Tokenizer { src, source, pos: 0, symbols: Vec::new() }
    }

    /// Tokenize the whole input, preserving source order.
    pub fn run(mut self) -> Result<Vec<Symbol>> {
        if let Some(at) = self.src.find(|c: char| !c.is_ascii()) {
            return Err(ExprError::Tokenize(caret_diagnostic(self.src, at)));
        }
        while self.next_symbol()? {}
        Ok(self.symbols)
    }

    fn next_symbol(&mut self) -> Result<bool> {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return Ok(false);
        }
        let sym = if OPERATOR_CHARS.contains(&bytes[self.pos]) {
            self.operator()?
        } else {
            self.value()?
        };
        self.symbols.push(sym);
        Ok(true)
    }

    fn operator(&mut self) -> Result<Symbol> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        if bytes[start] == b'(' {
            self.pos += 1;
            return Ok(Symbol::Op(Op::OpenParen));
        }
        if bytes[start] == b')' {
            self.pos += 1;
            return Ok(Symbol::Op(Op::CloseParen));
        }
        let mut end = start + 1;
        while end < bytes.len() && OPERATOR_RUN_CHARS.contains(&bytes[end]) {
            end += 1;
        }
        self.pos = end;
        let op = match &self.src[start..end] {
            "," => Op::Comma,
            "*" => Op::Mul,
            "/" => Op::Div,
            "%" => Op::Mod,
            "^" => Op::Pow,
            "==" => Op::Eq,
            "!=" => Op::Ne,
            ">" => Op::Gt,
            "<" => Op::Lt,
            ">=" => Op::Ge,
            "<=" => Op::Le,
            "&&" => Op::LogicalAnd,
            "||" => Op::LogicalOr,
            "&" => Op::BitAnd,
            "|" => Op::BitOr,
            "!" => Op::LogicalNot,
            "~" => Op::BitNot,
            _ => return Err(ExprError::Tokenize(caret_diagnostic(self.src, start))),
        };
        Ok(Symbol::Op(op))
    }

    fn value(&mut self) -> Result<Symbol> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len()
            && !OPERATOR_CHARS.contains(&bytes[end])
            && !bytes[end].is_ascii_whitespace()
        {
            end += 1;
        }
        let token = &self.src[start..end];

        // A leading sign after a completed operand is a binary operator.
        if matches!(bytes[start], b'+' | b'-') && self.prev_is_operand() {
            self.pos = start + 1;
            return Ok(self.sign_op(bytes[start]));
        }

        // Greedy classification, shrinking at the rightmost sign on
        // failure so signed literals keep their sign.
        let mut len = token.len();
        loop {
            if let Some(sym) = self.classify(&token[..len]) {
                if sym.is_function() {
                    self.expect_open_paren(&token[..len], start + len)?;
                }
                self.pos = start + len;
                return Ok(sym);
            }
            match token[..len].rfind(&['+', '-'][..]) {
                Some(0) | None => break,
                Some(idx) => len = idx,
            }
        }

        // Unary sign position: emit the sign alone and rescan the rest.
        if matches!(bytes[start], b'+' | b'-') {
            self.pos = start + 1;
            return Ok(self.sign_op(bytes[start]));
        }

        Err(self.classify_failure(token, start))
    }

    fn sign_op(&self, byte: u8) -> Symbol {
        Symbol::Op(if byte == b'+' { Op::Add } else { Op::Sub })
    }

    fn prev_is_operand(&self) -> bool {
        matches!(
            self.symbols.last(),
            Some(Symbol::Node(_)) | Some(Symbol::Op(Op::CloseParen))
        )
    }

    /// Match a value token against the source schema, reserved names,
    /// numeric literal forms, and function keywords, in that order.
    fn classify(&self, token: &str) -> Option<Symbol> {
        if token.is_empty() {
            return None;
        }
        if let Some(f) = field_ref(self.source, token) {
            return Some(Symbol::Node(Node::field(f)));
        }
        if let Some(a) = self.source.alias(token) {
            return Some(Symbol::Node(Node::alias(a)));
        }
        if token == "currentEventNumber" {
            return Some(Symbol::Node(Node::counter(self.source.event_counter())));
        }
        if let Some(v) = parse_numeric(token) {
            return Some(Symbol::Node(Node::constant(v)));
        }
        if let Some(f) = Func::from_keyword(token) {
            return Some(Symbol::Func(f));
        }
        if token == "true" {
            return Some(Symbol::Node(Node::constant(Value::U64(1))));
        }
        if token == "false" {
            return Some(Symbol::Node(Node::constant(Value::U64(0))));
        }
        None
    }

    /// A function keyword must be immediately followed by `(`.
    fn expect_open_paren(&self, keyword: &str, from: usize) -> Result<()> {
        let bytes = self.src.as_bytes();
        let mut i = from;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'(' {
            return Err(ExprError::Type(format!("missing \"(\" after {keyword}")));
        }
        Ok(())
    }

    fn classify_failure(&self, token: &str, start: usize) -> ExprError {
        let identifier = token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if identifier {
            ExprError::UnknownName(token.to_string())
        } else {
            ExprError::Tokenize(caret_diagnostic(self.src, start))
        }
    }
}

fn field_ref(source: &dyn RecordSource, name: &str) -> Option<FieldRef> {
    if let Some(h) = source.unsigned_field(name) {
        return Some(FieldRef::U64(h));
    }
    if let Some(h) = source.signed_field(name) {
        return Some(FieldRef::I64(h));
    }
    source.float_field(name).map(FieldRef::F64)
}

/// Numeric literal forms, tried in order: hex U64 (`0x`/`0X` prefix),
/// decimal U64, decimal I64, decimal F64. The first parse that
/// consumes the whole token wins.
fn parse_numeric(token: &str) -> Option<Value> {
    if let Some(digits) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        if let Ok(x) = u64::from_str_radix(digits, 16) {
            return Some(Value::U64(x));
        }
    }
    if let Ok(x) = token.parse::<u64>() {
        return Some(Value::U64(x));
    }
    if let Ok(x) = token.parse::<i64>() {
        return Some(Value::I64(x));
    }
    if let Ok(x) = token.parse::<f64>() {
        return Some(Value::F64(x));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryRecordSource;
    use crate::value::ValueType;

    fn source() -> MemoryRecordSource {
        let mut src = MemoryRecordSource::new();
        src.add_unsigned_field("n", vec![vec![3]]);
        src.add_float_field("v", vec![vec![1.0, 2.0]]);
        src
    }

    fn tokens(expr: &str) -> Vec<Symbol> {
        let src = source();
        Tokenizer::new(expr, &src).run().unwrap()
    }

    #[test]
    fn numeric_literal_precedence() {
        assert_eq!(parse_numeric("42"), Some(Value::U64(42)));
        assert_eq!(parse_numeric("-42"), Some(Value::I64(-42)));
        assert_eq!(parse_numeric("4.5"), Some(Value::F64(4.5)));
        assert_eq!(parse_numeric("1e3"), Some(Value::F64(1000.0)));
        assert_eq!(parse_numeric("0x10"), Some(Value::U64(16)));
        assert_eq!(parse_numeric("0XfF"), Some(Value::U64(255)));
        assert_eq!(parse_numeric("x10"), None);
        assert_eq!(parse_numeric("10."), Some(Value::F64(10.0)));
    }

    #[test]
    fn operators_take_longest_match() {
        let toks = tokens("n <= 3 && v >= 1");
        assert_eq!(toks.len(), 7);
        assert!(matches!(toks[1], Symbol::Op(Op::Le)));
        assert!(matches!(toks[3], Symbol::Op(Op::LogicalAnd)));
        assert!(matches!(toks[5], Symbol::Op(Op::Ge)));
    }

    #[test]
    fn leading_sign_after_an_operand_is_binary() {
        let toks = tokens("n -1");
        assert_eq!(toks.len(), 3);
        assert!(matches!(toks[1], Symbol::Op(Op::Sub)));
        assert!(matches!(&toks[2], Symbol::Node(nd) if nd.get(0) == Value::U64(1)));
    }

    #[test]
    fn leading_sign_in_unary_position_folds_into_a_literal() {
        let toks = tokens("-5");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.get(0) == Value::I64(-5)));
    }

    #[test]
    fn unary_sign_on_a_field_becomes_an_operator() {
        let toks = tokens("-n + 1");
        assert_eq!(toks.len(), 4);
        assert!(matches!(toks[0], Symbol::Op(Op::Sub)));
        assert!(matches!(&toks[1], Symbol::Node(nd) if nd.name() == Some("n")));
        assert!(matches!(toks[2], Symbol::Op(Op::Add)));
    }

    #[test]
    fn signed_exponent_literals_stay_whole() {
        let toks = tokens("1e-5");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.get(0) == Value::F64(1e-5)));
    }

    #[test]
    fn literal_glued_to_a_minus_splits() {
        let toks = tokens("1e5-3");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.get(0) == Value::F64(1e5)));
        assert!(matches!(toks[1], Symbol::Op(Op::Sub)));
    }

    #[test]
    fn fields_shadow_function_keywords() {
        let mut src = MemoryRecordSource::new();
        src.add_float_field("sin", vec![vec![0.5]]);
        let toks = Tokenizer::new("sin", &src).run().unwrap();
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.element_type() == ValueType::F64));
    }

    #[test]
    fn function_keyword_requires_a_paren() {
        let src = source();
        let err = Tokenizer::new("sin", &src).run().unwrap_err();
        assert!(matches!(err, ExprError::Type(_)), "got {err:?}");
        let err = Tokenizer::new("sqrt 2", &src).run().unwrap_err();
        assert!(matches!(err, ExprError::Type(_)));
        // A paren after whitespace is fine.
        assert!(Tokenizer::new("sqrt (v)", &src).run().is_ok());
    }

    #[test]
    fn unknown_identifiers_and_glyphs_are_told_apart() {
        let src = source();
        let err = Tokenizer::new("zenith + 1", &src).run().unwrap_err();
        assert!(matches!(err, ExprError::UnknownName(name) if name == "zenith"));
        let err = Tokenizer::new("n $ 2", &src).run().unwrap_err();
        match err {
            ExprError::Tokenize(msg) => assert!(msg.contains('^')),
            other => panic!("expected a tokenize error, got {other:?}"),
        }
    }

    #[test]
    fn reserved_names_classify_before_keywords() {
        let toks = tokens("currentEventNumber + 1");
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.element_type() == ValueType::U64));
        let toks = tokens("true");
        assert!(matches!(&toks[0], Symbol::Node(nd) if nd.get(0) == Value::U64(1)));
    }

    #[test]
    fn non_ascii_input_is_rejected() {
        let src = source();
        let err = Tokenizer::new("n > π", &src).run().unwrap_err();
        assert!(matches!(err, ExprError::Tokenize(_)));
    }
}
