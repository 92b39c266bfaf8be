//! Evaluator nodes: the typed per-row vector tree a compiled
//! expression is made of.
//!
//! Every node is a pure function of the current record with a fixed
//! element type, a per-row `size`, and per-element `get`. Binary nodes
//! broadcast mismatched operand sizes by repeating the shorter
//! operand's last element; reducers collapse a vector to a single
//! element. Type promotion resolves each binary operation to a
//! dominant operand type once, at construction.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{ExprError, Result};
use crate::record::{Alias, EventCounter, FieldHandle};
use crate::symbol::{Func, Symbol};
use crate::value::{Value, ValueType};

/// Random-number stream shared by the `rand()` nodes of one
/// expression.
pub(crate) type SharedRng = Rc<RefCell<StdRng>>;

/// Typed field leaf over any of the three element types.
#[derive(Debug, Clone)]
pub(crate) enum FieldRef {
    U64(FieldHandle<u64>),
    I64(FieldHandle<i64>),
    F64(FieldHandle<f64>),
}

impl FieldRef {
    fn element_type(&self) -> ValueType {
        match self {
            FieldRef::U64(_) => ValueType::U64,
            FieldRef::I64(_) => ValueType::I64,
            FieldRef::F64(_) => ValueType::F64,
        }
    }

    fn size(&self) -> u32 {
        match self {
            FieldRef::U64(h) => h.size(),
            FieldRef::I64(h) => h.size(),
            FieldRef::F64(h) => h.size(),
        }
    }

    fn get(&self, i: u32) -> Value {
        match self {
            FieldRef::U64(h) => Value::U64(h.get(i)),
            FieldRef::I64(h) => Value::I64(h.get(i)),
            FieldRef::F64(h) => Value::F64(h.get(i)),
        }
    }

    fn name(&self) -> &str {
        match self {
            FieldRef::U64(h) => h.name(),
            FieldRef::I64(h) => h.name(),
            FieldRef::F64(h) => h.name(),
        }
    }

    fn parent_name(&self) -> Option<&str> {
        match self {
            FieldRef::U64(h) => h.parent_name(),
            FieldRef::I64(h) => h.parent_name(),
            FieldRef::F64(h) => h.parent_name(),
        }
    }
}

/// Element-wise unary math functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryFunc {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Log,
    Log10,
    Exp,
    Abs,
    Sqrt,
    Ceil,
    Floor,
    IsNan,
    IsInf,
    Sinh,
    Cosh,
    Tanh,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    LogicalNot,
    BitNot,
    Neg,
}

/// Binary operators and two-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Fmod,
    Atan2,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
}

/// Vector reducers; always size 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reducer {
    Any,
    All,
    Sum,
    Unique,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Const(Value),
    Field(FieldRef),
    Alias(Alias),
    Counter(EventCounter),
    Rand(SharedRng),
    UnaryOp {
        op: UnaryOp,
        out: ValueType,
        arg: Box<Node>,
    },
    UnaryFunc {
        func: UnaryFunc,
        out: ValueType,
        arg: Box<Node>,
    },
    Cast {
        to: ValueType,
        arg: Box<Node>,
    },
    Reduce {
        reducer: Reducer,
        arg: Box<Node>,
    },
    In {
        arg: Box<Node>,
        set: Vec<Value>,
    },
    Binary {
        op: BinaryOp,
        dominant: ValueType,
        out: ValueType,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

/// One evaluator in a compiled expression tree.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
}

impl Node {
    /// Element type, fixed at construction.
    pub fn element_type(&self) -> ValueType {
        match &self.kind {
            NodeKind::Const(v) => v.value_type(),
            NodeKind::Field(f) => f.element_type(),
            NodeKind::Alias(a) => a.element_type(),
            NodeKind::Counter(_) => ValueType::U64,
            NodeKind::Rand(_) => ValueType::F64,
            NodeKind::UnaryOp { out, .. } | NodeKind::UnaryFunc { out, .. } => *out,
            NodeKind::Cast { to, .. } => *to,
            NodeKind::Reduce { reducer, arg } => match reducer {
                Reducer::Any | Reducer::All | Reducer::Unique => ValueType::U64,
                Reducer::Sum => arg.element_type(),
            },
            NodeKind::In { .. } => ValueType::U64,
            NodeKind::Binary { out, .. } => *out,
        }
    }

    /// Number of elements for the current record.
    pub fn size(&self) -> u32 {
        match &self.kind {
            NodeKind::Const(_) | NodeKind::Counter(_) | NodeKind::Rand(_) => 1,
            NodeKind::Field(f) => f.size(),
            NodeKind::Alias(a) => a.size(),
            NodeKind::UnaryOp { arg, .. }
            | NodeKind::UnaryFunc { arg, .. }
            | NodeKind::Cast { arg, .. }
            | NodeKind::In { arg, .. } => arg.size(),
            NodeKind::Reduce { .. } => 1,
            NodeKind::Binary { lhs, rhs, .. } => {
                let (a, b) = (lhs.size(), rhs.size());
                if a == 0 || b == 0 {
                    0
                } else {
                    a.max(b)
                }
            }
        }
    }

    /// The `i`-th element for the current record (`i < size()`).
    pub fn get(&self, i: u32) -> Value {
        match &self.kind {
            NodeKind::Const(v) => *v,
            NodeKind::Field(f) => f.get(i),
            NodeKind::Alias(a) => a.get(i),
            NodeKind::Counter(c) => Value::U64(c.get()),
            NodeKind::Rand(rng) => Value::F64(rng.borrow_mut().random::<f64>()),
            NodeKind::UnaryOp { op, out, arg } => eval_unary_op(*op, *out, arg.get(i)),
            NodeKind::UnaryFunc { func, arg, .. } => eval_unary_func(*func, arg.get(i)),
            NodeKind::Cast { to, arg } => arg.get(i).cast(*to),
            NodeKind::Reduce { reducer, arg } => eval_reduce(*reducer, arg),
            NodeKind::In { arg, set } => {
                let x = arg.get(i);
                Value::U64(set.iter().any(|v| *v == x) as u64)
            }
            NodeKind::Binary { op, dominant, lhs, rhs, .. } => {
                let a = lhs.get(i.min(lhs.size().saturating_sub(1)));
                let b = rhs.get(i.min(rhs.size().saturating_sub(1)));
                eval_binary(*op, *dominant, a, b)
            }
        }
    }

    /// Leaf name; present on field and alias leaves only.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Field(f) => Some(f.name()),
            NodeKind::Alias(a) => Some(a.name()),
            _ => None,
        }
    }

    /// Parent field name; present on field/alias leaves that declare
    /// one.
    pub fn parent_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Field(f) => f.parent_name(),
            NodeKind::Alias(a) => a.parent_name(),
            _ => None,
        }
    }

    /// True when the leaf declares a parent field.
    pub fn has_parent(&self) -> bool {
        self.parent_name().is_some()
    }

    // ── Construction ───────────────────────────────────────────────

    pub(crate) fn constant(v: Value) -> Node {
        NodeKind::Const(v).into()
    }

    pub(crate) fn field(f: FieldRef) -> Node {
        NodeKind::Field(f).into()
    }

    pub(crate) fn alias(a: Alias) -> Node {
        NodeKind::Alias(a).into()
    }

    pub(crate) fn counter(c: EventCounter) -> Node {
        NodeKind::Counter(c).into()
    }

    pub(crate) fn random(rng: SharedRng) -> Node {
        NodeKind::Rand(rng).into()
    }

    /// Wrap a node in an `any` reducer; the event-selection root.
    pub(crate) fn any_of(arg: Node) -> Node {
        NodeKind::Reduce { reducer: Reducer::Any, arg: Box::new(arg) }.into()
    }

    /// Build `!x`, `~x`, or unary minus.
    pub(crate) fn unary_op(op: UnaryOp, arg: Node) -> Result<Node> {
        let out = match op {
            UnaryOp::LogicalNot => ValueType::U64,
            UnaryOp::BitNot => {
                let t = arg.element_type();
                if !t.is_integer() {
                    return Err(ExprError::Type(
                        "\"~\" requires an integer operand".into(),
                    ));
                }
                t
            }
            UnaryOp::Neg => match arg.element_type() {
                ValueType::F64 => ValueType::F64,
                _ => ValueType::I64,
            },
        };
        Ok(NodeKind::UnaryOp { op, out, arg: Box::new(arg) }.into())
    }

    /// Build a single-argument function application: element-wise math,
    /// a cast, or a reducer.
    pub(crate) fn unary_function(func: Func, arg: Node) -> Result<Node> {
        let kind = match func {
            Func::Sin => math(UnaryFunc::Sin, arg),
            Func::Cos => math(UnaryFunc::Cos, arg),
            Func::Tan => math(UnaryFunc::Tan, arg),
            Func::Asin => math(UnaryFunc::Asin, arg),
            Func::Acos => math(UnaryFunc::Acos, arg),
            Func::Atan => math(UnaryFunc::Atan, arg),
            Func::Log => math(UnaryFunc::Log, arg),
            Func::Log10 => math(UnaryFunc::Log10, arg),
            Func::Exp => math(UnaryFunc::Exp, arg),
            Func::Abs => math(UnaryFunc::Abs, arg),
            Func::Sqrt => math(UnaryFunc::Sqrt, arg),
            Func::Ceil => math(UnaryFunc::Ceil, arg),
            Func::Floor => math(UnaryFunc::Floor, arg),
            Func::IsNan => math(UnaryFunc::IsNan, arg),
            Func::IsInf => math(UnaryFunc::IsInf, arg),
            Func::Sinh => math(UnaryFunc::Sinh, arg),
            Func::Cosh => math(UnaryFunc::Cosh, arg),
            Func::Tanh => math(UnaryFunc::Tanh, arg),
            Func::Int => NodeKind::Cast { to: ValueType::I64, arg: Box::new(arg) },
            Func::Unsigned => NodeKind::Cast { to: ValueType::U64, arg: Box::new(arg) },
            Func::Float => NodeKind::Cast { to: ValueType::F64, arg: Box::new(arg) },
            Func::Any => NodeKind::Reduce { reducer: Reducer::Any, arg: Box::new(arg) },
            Func::All => NodeKind::Reduce { reducer: Reducer::All, arg: Box::new(arg) },
            Func::Sum => NodeKind::Reduce { reducer: Reducer::Sum, arg: Box::new(arg) },
            Func::Unique => NodeKind::Reduce { reducer: Reducer::Unique, arg: Box::new(arg) },
            Func::Fmod | Func::Pow | Func::Atan2 | Func::In | Func::Rand => {
                unreachable!("{func} is not a unary function")
            }
        };
        Ok(kind.into())
    }

    /// Build `fmod`, `pow`, or `atan2`.
    pub(crate) fn binary_function(func: Func, lhs: Node, rhs: Node) -> Result<Node> {
        let op = match func {
            Func::Fmod => BinaryOp::Fmod,
            Func::Pow => BinaryOp::Pow,
            Func::Atan2 => BinaryOp::Atan2,
            _ => unreachable!("{func} is not a two-argument function"),
        };
        Node::binary(op, lhs, rhs)
    }

    /// Build a binary operator node, resolving the dominant operand
    /// type.
    pub(crate) fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Result<Node> {
        let dominant = lhs.element_type().dominant(rhs.element_type());
        if matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr) && !dominant.is_integer() {
            return Err(ExprError::Type(
                "bitwise operator requires integer operands".into(),
            ));
        }
        let out = binary_out(op, dominant);
        Ok(NodeKind::Binary { op, dominant, out, lhs: Box::new(lhs), rhs: Box::new(rhs) }.into())
    }

    /// Build a membership test. Every set element must be a constant;
    /// set values are cast to the element type of `arg`.
    pub(crate) fn membership(arg: Node, set_symbols: &[Symbol]) -> Result<Node> {
        let t = arg.element_type();
        let mut set = Vec::with_capacity(set_symbols.len());
        for s in set_symbols {
            let v = match s {
                Symbol::Node(n) => n.const_value(),
                _ => None,
            };
            match v {
                Some(v) => set.push(v.cast(t)),
                None => {
                    return Err(ExprError::Type(
                        "non-constant value in \"in\" membership list".into(),
                    ))
                }
            }
        }
        Ok(NodeKind::In { arg: Box::new(arg), set }.into())
    }

    fn const_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::Const(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<NodeKind> for Node {
    fn from(kind: NodeKind) -> Node {
        Node { kind }
    }
}

fn math(func: UnaryFunc, arg: Node) -> NodeKind {
    let out = match func {
        UnaryFunc::Abs => arg.element_type(),
        UnaryFunc::IsNan | UnaryFunc::IsInf => ValueType::U64,
        _ => ValueType::F64,
    };
    NodeKind::UnaryFunc { func, out, arg: Box::new(arg) }
}

/// Output type of `op` over operands promoted to `dominant`.
fn binary_out(op: BinaryOp, dominant: ValueType) -> ValueType {
    match op {
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::BitAnd
        | BinaryOp::BitOr => dominant,
        BinaryOp::Pow | BinaryOp::Fmod | BinaryOp::Atan2 => ValueType::F64,
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Gt
        | BinaryOp::Lt
        | BinaryOp::Ge
        | BinaryOp::Le
        | BinaryOp::LogicalAnd
        | BinaryOp::LogicalOr => ValueType::U64,
    }
}

// ── Evaluation ─────────────────────────────────────────────────────

fn eval_unary_op(op: UnaryOp, out: ValueType, v: Value) -> Value {
    match op {
        UnaryOp::LogicalNot => Value::U64(!v.is_truthy() as u64),
        UnaryOp::BitNot => match out {
            ValueType::U64 => Value::U64(!v.as_u64()),
            ValueType::I64 => Value::I64(!v.as_i64()),
            ValueType::F64 => unreachable!("bitwise operand checked at build"),
        },
        UnaryOp::Neg => match out {
            ValueType::I64 => Value::I64(v.as_i64().wrapping_neg()),
            ValueType::F64 => Value::F64(-v.as_f64()),
            ValueType::U64 => unreachable!("negation never yields unsigned"),
        },
    }
}

fn eval_unary_func(func: UnaryFunc, v: Value) -> Value {
    match func {
        UnaryFunc::Abs => match v {
            Value::U64(x) => Value::U64(x),
            Value::I64(x) => Value::I64(x.wrapping_abs()),
            Value::F64(x) => Value::F64(x.abs()),
        },
        UnaryFunc::IsNan => Value::U64(matches!(v, Value::F64(x) if x.is_nan()) as u64),
        UnaryFunc::IsInf => Value::U64(matches!(v, Value::F64(x) if x.is_infinite()) as u64),
        _ => {
            let x = v.as_f64();
            Value::F64(match func {
                UnaryFunc::Sin => x.sin(),
                UnaryFunc::Cos => x.cos(),
                UnaryFunc::Tan => x.tan(),
                UnaryFunc::Asin => x.asin(),
                UnaryFunc::Acos => x.acos(),
                UnaryFunc::Atan => x.atan(),
                UnaryFunc::Log => x.ln(),
                UnaryFunc::Log10 => x.log10(),
                UnaryFunc::Exp => x.exp(),
                UnaryFunc::Sqrt => x.sqrt(),
                UnaryFunc::Ceil => x.ceil(),
                UnaryFunc::Floor => x.floor(),
                UnaryFunc::Sinh => x.sinh(),
                UnaryFunc::Cosh => x.cosh(),
                UnaryFunc::Tanh => x.tanh(),
                UnaryFunc::Abs | UnaryFunc::IsNan | UnaryFunc::IsInf => unreachable!(),
            })
        }
    }
}

fn eval_reduce(reducer: Reducer, arg: &Node) -> Value {
    let n = arg.size();
    match reducer {
        Reducer::Any => Value::U64((0..n).any(|i| arg.get(i).is_truthy()) as u64),
        Reducer::All => Value::U64((0..n).all(|i| arg.get(i).is_truthy()) as u64),
        Reducer::Sum => match arg.element_type() {
            ValueType::U64 => {
                Value::U64((0..n).fold(0u64, |acc, i| acc.wrapping_add(arg.get(i).as_u64())))
            }
            ValueType::I64 => {
                Value::I64((0..n).fold(0i64, |acc, i| acc.wrapping_add(arg.get(i).as_i64())))
            }
            ValueType::F64 => Value::F64((0..n).map(|i| arg.get(i).as_f64()).sum()),
        },
        Reducer::Unique => {
            let mut seen = HashSet::with_capacity(n as usize);
            for i in 0..n {
                // Distinctness by bit pattern; -0.0 folds into 0.0.
                seen.insert(match arg.get(i) {
                    Value::U64(x) => x,
                    Value::I64(x) => x as u64,
                    Value::F64(x) => (if x == 0.0 { 0.0 } else { x }).to_bits(),
                });
            }
            Value::U64(seen.len() as u64)
        }
    }
}

fn eval_binary(op: BinaryOp, dominant: ValueType, a: Value, b: Value) -> Value {
    match op {
        BinaryOp::Pow | BinaryOp::Fmod | BinaryOp::Atan2 => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Value::F64(match op {
                BinaryOp::Pow => x.powf(y),
                BinaryOp::Fmod => x % y,
                BinaryOp::Atan2 => x.atan2(y),
                _ => unreachable!(),
            })
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arith(op, dominant, a, b)
        }
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Gt
        | BinaryOp::Lt
        | BinaryOp::Ge
        | BinaryOp::Le => {
            let hit = match dominant {
                ValueType::U64 => compare(op, a.as_u64(), b.as_u64()),
                ValueType::I64 => compare(op, a.as_i64(), b.as_i64()),
                ValueType::F64 => compare(op, a.as_f64(), b.as_f64()),
            };
            Value::U64(hit as u64)
        }
        BinaryOp::LogicalAnd => Value::U64((a.is_truthy() && b.is_truthy()) as u64),
        BinaryOp::LogicalOr => Value::U64((a.is_truthy() || b.is_truthy()) as u64),
        BinaryOp::BitAnd | BinaryOp::BitOr => match dominant {
            ValueType::U64 => {
                let (x, y) = (a.as_u64(), b.as_u64());
                Value::U64(if op == BinaryOp::BitAnd { x & y } else { x | y })
            }
            ValueType::I64 => {
                let (x, y) = (a.as_i64(), b.as_i64());
                Value::I64(if op == BinaryOp::BitAnd { x & y } else { x | y })
            }
            ValueType::F64 => unreachable!("bitwise operands checked at build"),
        },
    }
}

/// Arithmetic over operands promoted to the dominant type. Integer
/// division or remainder by zero yields 0; F64 keeps IEEE-754
/// semantics.
fn eval_arith(op: BinaryOp, dominant: ValueType, a: Value, b: Value) -> Value {
    match dominant {
        ValueType::U64 => {
            let (x, y) = (a.as_u64(), b.as_u64());
            Value::U64(match op {
                BinaryOp::Add => x.wrapping_add(y),
                BinaryOp::Sub => x.wrapping_sub(y),
                BinaryOp::Mul => x.wrapping_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        0
                    } else {
                        x / y
                    }
                }
                BinaryOp::Mod => {
                    if y == 0 {
                        0
                    } else {
                        x % y
                    }
                }
                _ => unreachable!(),
            })
        }
        ValueType::I64 => {
            let (x, y) = (a.as_i64(), b.as_i64());
            Value::I64(match op {
                BinaryOp::Add => x.wrapping_add(y),
                BinaryOp::Sub => x.wrapping_sub(y),
                BinaryOp::Mul => x.wrapping_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        0
                    } else {
                        x.wrapping_div(y)
                    }
                }
                BinaryOp::Mod => {
                    if y == 0 {
                        0
                    } else {
                        x.wrapping_rem(y)
                    }
                }
                _ => unreachable!(),
            })
        }
        ValueType::F64 => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Value::F64(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                BinaryOp::Mod => x % y,
                _ => unreachable!(),
            })
        }
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, x: T, y: T) -> bool {
    match op {
        BinaryOp::Eq => x == y,
        BinaryOp::Ne => x != y,
        BinaryOp::Gt => x > y,
        BinaryOp::Lt => x < y,
        BinaryOp::Ge => x >= y,
        BinaryOp::Le => x <= y,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_field(values: &[f64]) -> Node {
        let h = FieldHandle::<f64>::new("v", None);
        h.load(values);
        Node::field(FieldRef::F64(h))
    }

    fn u64_field(values: &[u64]) -> Node {
        let h = FieldHandle::<u64>::new("n", None);
        h.load(values);
        Node::field(FieldRef::U64(h))
    }

    #[test]
    fn binary_sizes_broadcast_to_the_longer_operand() {
        let v = f64_field(&[1.0, 2.0, 3.0]);
        let one = Node::constant(Value::U64(1));
        let sum = Node::binary(BinaryOp::Add, v, one).unwrap();
        assert_eq!(sum.size(), 3);
        assert_eq!(sum.element_type(), ValueType::F64);
        assert_eq!(sum.get(2), Value::F64(4.0));

        // A size-1 lhs repeats across the rhs.
        let n = u64_field(&[10]);
        let v = f64_field(&[1.0, 2.0]);
        let prod = Node::binary(BinaryOp::Mul, n, v).unwrap();
        assert_eq!(prod.size(), 2);
        assert_eq!(prod.get(0), Value::F64(10.0));
        assert_eq!(prod.get(1), Value::F64(20.0));
    }

    #[test]
    fn empty_operand_empties_the_result() {
        let v = f64_field(&[]);
        let one = Node::constant(Value::F64(1.0));
        let sum = Node::binary(BinaryOp::Add, v, one).unwrap();
        assert_eq!(sum.size(), 0);
    }

    #[test]
    fn shorter_vector_repeats_its_last_element() {
        let a = f64_field(&[1.0, 2.0]);
        let h = FieldHandle::<f64>::new("w", None);
        h.load(&[10.0, 20.0, 30.0]);
        let b = Node::field(FieldRef::F64(h));
        let sum = Node::binary(BinaryOp::Add, a, b).unwrap();
        assert_eq!(sum.size(), 3);
        assert_eq!(sum.get(2), Value::F64(32.0));
    }

    #[test]
    fn reducers_have_size_one() {
        let v = u64_field(&[0, 3, 0]);
        let any = Node::unary_function(Func::Any, v.clone()).unwrap();
        assert_eq!(any.size(), 1);
        assert_eq!(any.get(0), Value::U64(1));

        let all = Node::unary_function(Func::All, v.clone()).unwrap();
        assert_eq!(all.get(0), Value::U64(0));

        let sum = Node::unary_function(Func::Sum, v).unwrap();
        assert_eq!(sum.element_type(), ValueType::U64);
        assert_eq!(sum.get(0), Value::U64(3));
    }

    #[test]
    fn reducers_on_an_empty_row() {
        let v = f64_field(&[]);
        let any = Node::unary_function(Func::Any, v.clone()).unwrap();
        let all = Node::unary_function(Func::All, v.clone()).unwrap();
        let sum = Node::unary_function(Func::Sum, v.clone()).unwrap();
        let uniq = Node::unary_function(Func::Unique, v).unwrap();
        assert_eq!(any.get(0), Value::U64(0));
        // `all` of nothing is vacuously true.
        assert_eq!(all.get(0), Value::U64(1));
        assert_eq!(sum.get(0), Value::F64(0.0));
        assert_eq!(uniq.get(0), Value::U64(0));
    }

    #[test]
    fn unique_counts_distinct_values() {
        let v = f64_field(&[1.0, 2.0, 1.0, -0.0, 0.0]);
        let uniq = Node::unary_function(Func::Unique, v).unwrap();
        assert_eq!(uniq.get(0), Value::U64(3));
    }

    #[test]
    fn membership_casts_to_the_operand_type() {
        let n = u64_field(&[3]);
        let set = [
            Symbol::Node(Node::constant(Value::F64(3.0))),
            Symbol::Node(Node::constant(Value::U64(5))),
        ];
        let m = Node::membership(n, &set).unwrap();
        assert_eq!(m.element_type(), ValueType::U64);
        assert_eq!(m.get(0), Value::U64(1));
    }

    #[test]
    fn membership_rejects_non_constants() {
        let n = u64_field(&[3]);
        let set = [Symbol::Node(u64_field(&[1]))];
        let err = Node::membership(n, &set).unwrap_err();
        assert!(matches!(err, ExprError::Type(_)));
    }

    #[test]
    fn bitwise_rejects_floats_at_build() {
        let v = f64_field(&[1.0]);
        let one = Node::constant(Value::U64(1));
        let err = Node::binary(BinaryOp::BitOr, v.clone(), one).unwrap_err();
        assert!(matches!(err, ExprError::Type(_)));
        let err = Node::unary_op(UnaryOp::BitNot, v).unwrap_err();
        assert!(matches!(err, ExprError::Type(_)));
    }

    #[test]
    fn integer_division_by_zero_yields_zero() {
        let zero = Node::constant(Value::U64(0));
        let seven = Node::constant(Value::U64(7));
        let div = Node::binary(BinaryOp::Div, seven.clone(), zero.clone()).unwrap();
        assert_eq!(div.get(0), Value::U64(0));
        let rem = Node::binary(BinaryOp::Mod, seven, zero).unwrap();
        assert_eq!(rem.get(0), Value::U64(0));
    }

    #[test]
    fn float_division_by_zero_follows_ieee() {
        let zero = Node::constant(Value::F64(0.0));
        let seven = Node::constant(Value::F64(7.0));
        let div = Node::binary(BinaryOp::Div, seven, zero).unwrap();
        assert_eq!(div.get(0), Value::F64(f64::INFINITY));
    }

    #[test]
    fn negation_promotes_unsigned_to_signed() {
        let n = u64_field(&[3]);
        let neg = Node::unary_op(UnaryOp::Neg, n).unwrap();
        assert_eq!(neg.element_type(), ValueType::I64);
        assert_eq!(neg.get(0), Value::I64(-3));
    }

    #[test]
    fn abs_preserves_the_operand_type() {
        let i = Node::constant(Value::I64(-4));
        let abs = Node::unary_function(Func::Abs, i).unwrap();
        assert_eq!(abs.element_type(), ValueType::I64);
        assert_eq!(abs.get(0), Value::I64(4));

        let f = Node::constant(Value::F64(-4.5));
        let abs = Node::unary_function(Func::Abs, f).unwrap();
        assert_eq!(abs.get(0), Value::F64(4.5));
    }

    #[test]
    fn casts_are_idempotent() {
        let x = Node::constant(Value::F64(2.7));
        let once = Node::unary_function(Func::Int, x).unwrap();
        let twice = Node::unary_function(Func::Int, once.clone()).unwrap();
        assert_eq!(once.get(0), twice.get(0));
        assert_eq!(once.get(0), Value::I64(2));
    }

    #[test]
    fn mod_with_a_float_operand_behaves_like_fmod() {
        let a = Node::constant(Value::F64(7.5));
        let b = Node::constant(Value::U64(2));
        let m = Node::binary(BinaryOp::Mod, a, b).unwrap();
        assert_eq!(m.element_type(), ValueType::F64);
        assert_eq!(m.get(0), Value::F64(1.5));
    }

    #[test]
    fn comparisons_promote_before_comparing() {
        // Unsigned 3 against signed -1: signed comparison, not wrapped.
        let a = Node::constant(Value::U64(3));
        let b = Node::constant(Value::I64(-1));
        let gt = Node::binary(BinaryOp::Gt, a, b).unwrap();
        assert_eq!(gt.get(0), Value::U64(1));
    }
}
