//! Compiled expressions over a record source, plus the numerical and
//! event-selection wrappers used by histogram tooling.
//!
//! Compilation tokenizes the input against the source schema, reduces
//! the symbol list to a single typed node tree, and hands ownership of
//! that tree to the returned [`Expression`]. Evaluation is per row:
//! advance the source with `read()`, then ask the expression for its
//! current size and elements.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::node::Node;
use crate::parser::Parser;
use crate::record::RecordSource;
use crate::tokenizer::Tokenizer;
use crate::value::{Value, ValueType};

/// Seed source for `compile`: deterministic within a process so a
/// rerun of the same scan draws the same `rand()` stream per
/// expression, without threading a seed through every call site.
static NEXT_RNG_SEED: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

/// A compiled expression bound to a record source.
///
/// The expression owns its node tree; leaves hold shared handles into
/// the source's per-row storage, so evaluation always reflects the
/// most recent `read()`. One expression per thread: the handles are
/// `Rc`-based and not `Send`.
#[derive(Debug, Clone)]
pub struct Expression {
    text: String,
    root: Node,
}

impl Expression {
    /// Parse and compile `text` against `source`.
    pub fn compile(text: &str, source: &dyn RecordSource) -> Result<Self> {
        Self::compile_seeded(text, source, NEXT_RNG_SEED.fetch_add(1, Ordering::Relaxed))
    }

    /// Compile with a fixed seed for the expression's `rand()` stream.
    pub fn compile_seeded(text: &str, source: &dyn RecordSource, seed: u64) -> Result<Self> {
        let symbols = Tokenizer::new(text, source).run()?;
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));
        let root = Parser::new(rng).parse(symbols)?;
        Ok(Expression { text: text.to_string(), root })
    }

    /// Element type of the expression result.
    pub fn root_element_type(&self) -> ValueType {
        self.root.element_type()
    }

    /// Number of elements for the current row.
    pub fn size(&self) -> u32 {
        self.root.size()
    }

    /// The `i`-th element for the current row (`i < size()`).
    pub fn get(&self, i: u32) -> Value {
        self.root.get(i)
    }

    /// The source text this expression was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }
}

/// Boolean event filter: selects a row when any element of the
/// expression's result vector is non-zero.
///
/// The compiled root is wrapped in an `any` reducer, so an empty row
/// rejects and a vector-valued filter selects on any hit.
#[derive(Debug, Clone)]
pub struct EventSelectExpression {
    text: String,
    select: Node,
}

impl EventSelectExpression {
    /// Compile `text` against `source` as an event filter.
    pub fn new(text: &str, source: &dyn RecordSource) -> Result<Self> {
        let Expression { text, root } = Expression::compile(text, source)?;
        Ok(EventSelectExpression { text, select: Node::any_of(root) })
    }

    /// Evaluate the filter for the current row.
    pub fn select(&self) -> bool {
        self.select.get(0).is_truthy()
    }

    /// The source text this filter was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Expression evaluated as a scalar numerical projection, one value
/// per row, for histogram filling and similar consumers.
#[derive(Debug, Clone)]
pub struct NumericalExpression {
    expr: Expression,
}

impl NumericalExpression {
    /// Compile `text` against `source`.
    pub fn new(text: &str, source: &dyn RecordSource) -> Result<Self> {
        Ok(NumericalExpression { expr: Expression::compile(text, source)? })
    }

    /// First element of the current row as F64; `None` when the row is
    /// empty.
    pub fn evaluate(&self) -> Option<f64> {
        if self.expr.size() == 0 {
            None
        } else {
            Some(self.expr.get(0).as_f64())
        }
    }

    /// The underlying compiled expression.
    pub fn expression(&self) -> &Expression {
        &self.expr
    }
}
