//! Symbols: the shared container tokens and partially reduced nodes
//! live in while an expression is being parsed.

use std::fmt;

use crate::node::Node;

/// Operator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `^`, exponentiation.
    Pow,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    BitAnd,
    BitOr,
    BitNot,
    Comma,
    OpenParen,
    CloseParen,
}

impl Op {
    /// True for `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Gt | Op::Lt | Op::Ge | Op::Le)
    }

    /// True for `==` and `!=`.
    pub fn is_equality(self) -> bool {
        matches!(self, Op::Eq | Op::Ne)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Pow => "^",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::LogicalAnd => "&&",
            Op::LogicalOr => "||",
            Op::LogicalNot => "!",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitNot => "~",
            Op::Comma => ",",
            Op::OpenParen => "(",
            Op::CloseParen => ")",
        })
    }
}

/// Function keywords recognized by the value classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Func {
    // Element-wise math.
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
    // Casts.
    Int,
    Unsigned,
    Float,
    // Vector reducers.
    Unique,
    Any,
    All,
    Sum,
    // Two-argument functions.
    Fmod,
    Pow,
    Atan2,
    /// Membership test against a constant list.
    In,
    // No-argument functions.
    Rand,
}

impl Func {
    /// Look up a function keyword. `fabs` is an accepted spelling of
    /// `abs`, and `double` of `float`.
    pub fn from_keyword(word: &str) -> Option<Func> {
        Some(match word {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "exp" => Func::Exp,
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "ceil" => Func::Ceil,
            "floor" => Func::Floor,
            "isnan" => Func::IsNan,
            "isinf" => Func::IsInf,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "int" => Func::Int,
            "unsigned" => Func::Unsigned,
            "float" | "double" => Func::Float,
            "unique" => Func::Unique,
            "any" => Func::Any,
            "all" => Func::All,
            "sum" => Func::Sum,
            "fmod" => Func::Fmod,
            "pow" => Func::Pow,
            "atan2" => Func::Atan2,
            "in" => Func::In,
            "rand" => Func::Rand,
            _ => return None,
        })
    }

    /// True for functions taking a single argument.
    pub fn is_unary(self) -> bool {
        !self.is_binary() && !self.is_void()
    }

    /// True for functions taking exactly two arguments.
    pub fn is_binary(self) -> bool {
        matches!(self, Func::Fmod | Func::Pow | Func::Atan2 | Func::In)
    }

    /// True for functions taking no argument.
    pub fn is_void(self) -> bool {
        matches!(self, Func::Rand)
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Log => "log",
            Func::Log10 => "log10",
            Func::Exp => "exp",
            Func::Abs => "abs",
            Func::Sqrt => "sqrt",
            Func::Ceil => "ceil",
            Func::Floor => "floor",
            Func::IsNan => "isnan",
            Func::IsInf => "isinf",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Int => "int",
            Func::Unsigned => "unsigned",
            Func::Float => "float",
            Func::Unique => "unique",
            Func::Any => "any",
            Func::All => "all",
            Func::Sum => "sum",
            Func::Fmod => "fmod",
            Func::Pow => "pow",
            Func::Atan2 => "atan2",
            Func::In => "in",
            Func::Rand => "rand",
        })
    }
}

/// One element of the parser's work list: an operator token, a function
/// keyword awaiting its argument, a fully built evaluator, or an
/// argument list produced by comma folding.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// An operator token.
    Op(Op),
    /// A function keyword.
    Func(Func),
    /// A fully built evaluator node.
    Node(Node),
    /// An argument list.
    List(Vec<Symbol>),
}

impl Symbol {
    /// True for built evaluator nodes.
    pub fn is_node(&self) -> bool {
        matches!(self, Symbol::Node(_))
    }

    /// True for function keywords.
    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Func(_))
    }

    /// True for single-argument function keywords.
    pub fn is_unary_function(&self) -> bool {
        matches!(self, Symbol::Func(f) if f.is_unary())
    }

    /// True for two-argument function keywords.
    pub fn is_binary_function(&self) -> bool {
        matches!(self, Symbol::Func(f) if f.is_binary())
    }

    /// True for no-argument function keywords.
    pub fn is_void_function(&self) -> bool {
        matches!(self, Symbol::Func(f) if f.is_void())
    }

    /// True for the ordering comparison operators.
    pub fn is_comparison(&self) -> bool {
        matches!(self, Symbol::Op(op) if op.is_comparison())
    }

    /// True for `==` and `!=`.
    pub fn is_equality(&self) -> bool {
        matches!(self, Symbol::Op(op) if op.is_equality())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Op(op) => write!(f, "\"{op}\""),
            Symbol::Func(func) => write!(f, "\"{func}\""),
            Symbol::Node(_) => f.write_str("value"),
            Symbol::List(items) => write!(f, "argument list of {}", items.len()),
        }
    }
}
