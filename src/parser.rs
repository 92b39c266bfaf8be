//! Parser: reduces the flat symbol list to a single evaluator node.
//!
//! Reduction runs in fixed phases over a symbol vector, each pass
//! replacing a contiguous slice with one freshly built symbol:
//! parentheses first (recursing on their contents), then functions and
//! `^`, the unary operators, the binary tiers in precedence order, and
//! finally comma folding into argument lists. Passes scan left to
//! right, so same-precedence operators are left-associative.

use crate::error::{ExprError, Result};
use crate::node::{BinaryOp, Node, SharedRng, UnaryOp};
use crate::symbol::{Func, Op, Symbol};

pub(crate) struct Parser {
    rng: SharedRng,
}

impl Parser {
    pub fn new(rng: SharedRng) -> Self {
        Parser { rng }
    }

    /// Reduce a full symbol list to the expression root.
    pub fn parse(&self, symbols: Vec<Symbol>) -> Result<Node> {
        if symbols.is_empty() {
            return Err(ExprError::Parse("no evaluation expression".into()));
        }
        let mut reduced = self.reduce(symbols)?;
        if reduced.len() != 1 {
            return Err(ExprError::Parse(format!(
                "invalid expression: {} symbols left after reduction",
                reduced.len()
            )));
        }
        match reduced.pop() {
            Some(Symbol::Node(node)) => Ok(node),
            Some(other) => Err(ExprError::Parse(format!(
                "expression reduces to {other}, not a value"
            ))),
            None => unreachable!(),
        }
    }

    fn reduce(&self, mut syms: Vec<Symbol>) -> Result<Vec<Symbol>> {
        while self.reduce_parentheses(&mut syms)? {}
        self.reduce_functions(&mut syms)?;
        self.reduce_unary(&mut syms)?;
        self.reduce_binary(&mut syms, |op| matches!(op, Op::Mul | Op::Div | Op::Mod))?;
        self.reduce_binary(&mut syms, |op| matches!(op, Op::Add | Op::Sub))?;
        self.reduce_binary(&mut syms, Op::is_comparison)?;
        self.reduce_binary(&mut syms, Op::is_equality)?;
        self.reduce_binary(&mut syms, |op| op == Op::BitAnd)?;
        self.reduce_binary(&mut syms, |op| op == Op::BitOr)?;
        self.reduce_binary(&mut syms, |op| op == Op::LogicalAnd)?;
        self.reduce_binary(&mut syms, |op| op == Op::LogicalOr)?;
        self.reduce_commas(&mut syms)?;
        Ok(syms)
    }

    /// Replace the first parenthesized group with its reduced contents.
    fn reduce_parentheses(&self, syms: &mut Vec<Symbol>) -> Result<bool> {
        let mut open = None;
        let mut close = None;
        let mut depth = 0i32;
        for (i, s) in syms.iter().enumerate() {
            match s {
                Symbol::Op(Op::OpenParen) => {
                    depth += 1;
                    if open.is_none() {
                        open = Some(i);
                    }
                }
                Symbol::Op(Op::CloseParen) => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(ExprError::Parse("found unpaired \")\"".into()));
                    }
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let open = match open {
            Some(i) => i,
            None => return Ok(false),
        };
        let close = match close {
            Some(i) => i,
            None => return Err(ExprError::Parse("found unpaired \"(\"".into())),
        };

        let inner: Vec<Symbol> = syms.drain(open + 1..close).collect();
        let reduced = self.reduce(inner)?;
        if reduced.len() > 1 {
            return Err(ExprError::Parse(
                "invalid parenthesized sub-expression".into(),
            ));
        }
        syms.splice(open..open + 2, reduced);
        Ok(true)
    }

    /// Apply function keywords to the symbol on their right; `^`
    /// consumes its operand triple here, before the multiplicative
    /// pass, so exponentiation binds tighter than unary minus.
    fn reduce_functions(&self, syms: &mut Vec<Symbol>) -> Result<()> {
        let mut i = 0;
        while i < syms.len() {
            match &syms[i] {
                Symbol::Func(f) if f.is_void() => {
                    let f = *f;
                    if syms.get(i + 1).is_some_and(Symbol::is_node) {
                        return Err(ExprError::Parse(format!(
                            "too many arguments to function \"{f}\""
                        )));
                    }
                    syms[i] = Symbol::Node(Node::random(self.rng.clone()));
                    i += 1;
                }
                Symbol::Func(Func::In) => {
                    i = self.reduce_in(syms, i)?;
                }
                Symbol::Func(f) if f.is_unary() => {
                    let f = *f;
                    match syms.get(i + 1) {
                        Some(Symbol::Node(_)) => {}
                        Some(Symbol::List(_)) => {
                            return Err(ExprError::Parse(format!(
                                "too many arguments to unary function \"{f}\""
                            )))
                        }
                        _ => {
                            return Err(ExprError::Parse(format!(
                                "missing operand for unary function \"{f}\""
                            )))
                        }
                    }
                    if syms.get(i + 2).is_some_and(Symbol::is_node) {
                        return Err(ExprError::Parse(format!(
                            "too many arguments to unary function \"{f}\""
                        )));
                    }
                    let Symbol::Node(arg) = syms.remove(i + 1) else {
                        unreachable!()
                    };
                    syms[i] = Symbol::Node(Node::unary_function(f, arg)?);
                    i += 1;
                }
                Symbol::Func(f) => {
                    // Two-argument functions take a comma-built list.
                    let f = *f;
                    let args = match syms.get_mut(i + 1) {
                        Some(Symbol::List(items)) => std::mem::take(items),
                        _ => {
                            return Err(ExprError::Parse(format!(
                                "missing operands for binary function \"{f}\""
                            )))
                        }
                    };
                    syms.remove(i + 1);
                    if args.len() < 2 {
                        return Err(ExprError::Parse(format!(
                            "missing operands for binary function \"{f}\""
                        )));
                    }
                    if args.len() > 2 {
                        return Err(ExprError::Parse(format!(
                            "too many arguments to binary function \"{f}\""
                        )));
                    }
                    let mut args = args.into_iter();
                    let (first, second) = (args.next(), args.next());
                    let (Some(Symbol::Node(lhs)), Some(Symbol::Node(rhs))) = (first, second)
                    else {
                        return Err(ExprError::Parse(format!(
                            "missing operands for binary function \"{f}\""
                        )));
                    };
                    syms[i] = Symbol::Node(Node::binary_function(f, lhs, rhs)?);
                    i += 1;
                }
                Symbol::Op(Op::Pow) => {
                    if i == 0
                        || i + 1 >= syms.len()
                        || !syms[i - 1].is_node()
                        || !syms[i + 1].is_node()
                    {
                        return Err(ExprError::Parse("missing operand for \"^\"".into()));
                    }
                    let Symbol::Node(rhs) = syms.remove(i + 1) else {
                        unreachable!()
                    };
                    let Symbol::Node(lhs) = syms.remove(i - 1) else {
                        unreachable!()
                    };
                    syms[i - 1] = Symbol::Node(Node::binary(BinaryOp::Pow, lhs, rhs)?);
                    // The new node sits at i - 1; continue after it.
                }
                _ => i += 1,
            }
        }
        Ok(())
    }

    /// Build `in` in either of its shapes: infix `x in set` when a node
    /// precedes the keyword, call form `in(x, set)` otherwise. Returns
    /// the index scanning should continue from.
    fn reduce_in(&self, syms: &mut Vec<Symbol>, i: usize) -> Result<usize> {
        if i > 0 && syms[i - 1].is_node() {
            match syms.get(i + 1) {
                Some(Symbol::Node(_)) | Some(Symbol::List(_)) => {}
                _ => {
                    return Err(ExprError::Parse(
                        "missing membership list for \"in\"".into(),
                    ))
                }
            }
            let set = syms.remove(i + 1);
            let Symbol::Node(arg) = syms.remove(i - 1) else {
                unreachable!()
            };
            syms[i - 1] = Symbol::Node(Node::membership(arg, &membership_symbols(set))?);
            return Ok(i);
        }

        let args = match syms.get_mut(i + 1) {
            Some(Symbol::List(items)) => std::mem::take(items),
            _ => {
                return Err(ExprError::Parse(
                    "missing operands for binary function \"in\"".into(),
                ))
            }
        };
        syms.remove(i + 1);
        if args.len() != 2 {
            return Err(ExprError::Parse(format!(
                "binary function \"in\" takes 2 arguments, got {}",
                args.len()
            )));
        }
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(Symbol::Node(arg)), Some(set)) => {
                syms[i] = Symbol::Node(Node::membership(arg, &membership_symbols(set))?);
                Ok(i + 1)
            }
            _ => Err(ExprError::Parse(
                "first argument to \"in\" must be a value".into(),
            )),
        }
    }

    /// Apply `!`, `~`, and signs in unary position to the node on
    /// their right.
    fn reduce_unary(&self, syms: &mut Vec<Symbol>) -> Result<()> {
        let mut i = 0;
        while i < syms.len() {
            let op = match &syms[i] {
                Symbol::Op(Op::LogicalNot) => Some(UnaryOp::LogicalNot),
                Symbol::Op(Op::BitNot) => Some(UnaryOp::BitNot),
                // A sign with no operand before it is unary.
                Symbol::Op(o @ (Op::Add | Op::Sub)) if i == 0 || !syms[i - 1].is_node() => {
                    if *o == Op::Sub {
                        Some(UnaryOp::Neg)
                    } else {
                        None // unary plus is the identity
                    }
                }
                _ => {
                    i += 1;
                    continue;
                }
            };
            if !syms.get(i + 1).is_some_and(Symbol::is_node) {
                let sym = &syms[i];
                return Err(ExprError::Parse(format!("missing operand for unary {sym}")));
            }
            match op {
                Some(op) => {
                    let Symbol::Node(arg) = syms.remove(i + 1) else {
                        unreachable!()
                    };
                    syms[i] = Symbol::Node(Node::unary_op(op, arg)?);
                    i += 1;
                }
                None => {
                    // Drop the plus; its operand keeps the slot.
                    syms.remove(i);
                }
            }
        }
        Ok(())
    }

    /// One left-to-right pass replacing `[lhs, op, rhs]` triples for
    /// the operators selected by `wanted`.
    fn reduce_binary(&self, syms: &mut Vec<Symbol>, wanted: impl Fn(Op) -> bool) -> Result<()> {
        let mut i = 0;
        while i < syms.len() {
            let op = match &syms[i] {
                Symbol::Op(o) if wanted(*o) => *o,
                _ => {
                    i += 1;
                    continue;
                }
            };
            if i == 0 || i + 1 >= syms.len() || !syms[i - 1].is_node() || !syms[i + 1].is_node() {
                return Err(ExprError::Parse(format!("missing operand for \"{op}\"")));
            }
            let Symbol::Node(rhs) = syms.remove(i + 1) else {
                unreachable!()
            };
            let Symbol::Node(lhs) = syms.remove(i - 1) else {
                unreachable!()
            };
            syms[i - 1] = Symbol::Node(Node::binary(binary_op_for(op), lhs, rhs)?);
            // The new node sits at i - 1; continue scanning at i.
        }
        Ok(())
    }

    /// Fold commas into flat argument lists; stray commas at the edges
    /// are dropped.
    fn reduce_commas(&self, syms: &mut Vec<Symbol>) -> Result<()> {
        let mut i = 0;
        while i < syms.len() {
            if !matches!(syms[i], Symbol::Op(Op::Comma)) {
                i += 1;
                continue;
            }
            if i == 0 || i + 1 == syms.len() {
                syms.remove(i);
                continue;
            }
            let b = syms.remove(i + 1);
            let a = syms.remove(i - 1);
            let list = match a {
                Symbol::List(mut items) => {
                    items.push(b);
                    items
                }
                other => vec![other, b],
            };
            syms[i - 1] = Symbol::List(list);
            // The list sits at i - 1; the next symbol is at i.
        }
        Ok(())
    }
}

fn membership_symbols(set: Symbol) -> Vec<Symbol> {
    match set {
        Symbol::List(items) => items,
        other => vec![other],
    }
}

fn binary_op_for(op: Op) -> BinaryOp {
    match op {
        Op::Add => BinaryOp::Add,
        Op::Sub => BinaryOp::Sub,
        Op::Mul => BinaryOp::Mul,
        Op::Div => BinaryOp::Div,
        Op::Mod => BinaryOp::Mod,
        Op::Pow => BinaryOp::Pow,
        Op::Eq => BinaryOp::Eq,
        Op::Ne => BinaryOp::Ne,
        Op::Gt => BinaryOp::Gt,
        Op::Lt => BinaryOp::Lt,
        Op::Ge => BinaryOp::Ge,
        Op::Le => BinaryOp::Le,
        Op::LogicalAnd => BinaryOp::LogicalAnd,
        Op::LogicalOr => BinaryOp::LogicalOr,
        Op::BitAnd => BinaryOp::BitAnd,
        Op::BitOr => BinaryOp::BitOr,
        Op::LogicalNot | Op::BitNot | Op::Comma | Op::OpenParen | Op::CloseParen => {
            unreachable!("{op} is not a binary operator")
        }
    }
}
