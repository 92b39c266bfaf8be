//! Record sources: typed per-row vector fields, aliases, and the event
//! counter an expression binds against.
//!
//! A record source owns columnar storage and refreshes it row by row;
//! compiled expressions hold cheap shared handles into that storage and
//! re-read field values on every evaluation. The handles use `Rc`, so a
//! compiled expression is deliberately not `Send`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::Result;
use crate::expr::Expression;
use crate::value::{Value, ValueType};

/// Shared, read-only view of one typed field's current-row values.
///
/// The owning record source replaces the backing vector on every
/// `read()`; nodes keep clones of the handle.
#[derive(Debug, Clone)]
pub struct FieldHandle<T> {
    inner: Rc<FieldData<T>>,
}

#[derive(Debug)]
struct FieldData<T> {
    name: String,
    parent: Option<String>,
    values: RefCell<Vec<T>>,
}

impl<T: Copy> FieldHandle<T> {
    /// Create a handle with no loaded row yet.
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        FieldHandle {
            inner: Rc::new(FieldData {
                name: name.into(),
                parent,
                values: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the field storing this field's per-row length, if any.
    pub fn parent_name(&self) -> Option<&str> {
        self.inner.parent.as_deref()
    }

    /// Number of elements in the current row.
    pub fn size(&self) -> u32 {
        self.inner.values.borrow().len() as u32
    }

    /// The `i`-th element of the current row (`i < size()`).
    pub fn get(&self, i: u32) -> T {
        self.inner.values.borrow()[i as usize]
    }

    /// Replace the current-row contents. Called by the owning source.
    pub fn load(&self, values: &[T]) {
        let mut v = self.inner.values.borrow_mut();
        v.clear();
        v.extend_from_slice(values);
    }
}

/// Shared event counter a source advances on every `read()`.
#[derive(Debug, Clone, Default)]
pub struct EventCounter {
    inner: Rc<Cell<u64>>,
}

impl EventCounter {
    /// Current event number.
    pub fn get(&self) -> u64 {
        self.inner.get()
    }

    /// Set the event number. Called by the owning source.
    pub fn set(&self, n: u64) {
        self.inner.set(n);
    }
}

/// A named, precompiled expression a source exposes as if it were a
/// field.
#[derive(Debug, Clone)]
pub struct Alias {
    name: String,
    expr: Rc<Expression>,
}

impl Alias {
    /// Wrap a compiled expression under an alias name.
    pub fn new(name: impl Into<String>, expr: Expression) -> Self {
        Alias { name: name.into(), expr: Rc::new(expr) }
    }

    /// Alias name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type of the aliased expression.
    pub fn element_type(&self) -> ValueType {
        self.expr.root_element_type()
    }

    /// True when the head node of the aliased expression has a parent
    /// field.
    pub fn has_parent(&self) -> bool {
        self.parent_name().is_some()
    }

    /// Parent field of the aliased expression's head node, if any.
    pub fn parent_name(&self) -> Option<&str> {
        self.expr.root().parent_name()
    }

    pub(crate) fn size(&self) -> u32 {
        self.expr.size()
    }

    pub(crate) fn get(&self, i: u32) -> Value {
        self.expr.get(i)
    }
}

/// Contract an expression compiles against: typed per-row vector
/// fields, aliases, and a monotonically increasing event counter.
pub trait RecordSource {
    /// True if the source declares a field with this name.
    fn has_field(&self, name: &str) -> bool;

    /// Declared element type of a field.
    fn field_type(&self, name: &str) -> Option<ValueType>;

    /// Handle to an unsigned field, if `name` is one.
    fn unsigned_field(&self, name: &str) -> Option<FieldHandle<u64>>;

    /// Handle to a signed field, if `name` is one.
    fn signed_field(&self, name: &str) -> Option<FieldHandle<i64>>;

    /// Handle to a floating-point field, if `name` is one.
    fn float_field(&self, name: &str) -> Option<FieldHandle<f64>>;

    /// True if the source declares an alias with this name.
    fn has_alias(&self, name: &str) -> bool;

    /// The alias registered under `name`, if any.
    fn alias(&self, name: &str) -> Option<Alias>;

    /// Shared handle to the row counter.
    fn event_counter(&self) -> EventCounter;

    /// Row counter value for the current row.
    fn current_event_number(&self) -> u64 {
        self.event_counter().get()
    }

    /// Advance to the next row; false at end of stream.
    fn read(&mut self) -> bool;
}

#[derive(Debug)]
struct MemColumn<T> {
    handle: FieldHandle<T>,
    rows: Vec<Vec<T>>,
}

/// Columnar in-memory record source.
///
/// Fields are declared up front with their per-row value vectors;
/// `read()` loads one row at a time into every handle. Used by tests,
/// benches, and anywhere a full record file is overkill.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    unsigned: Vec<MemColumn<u64>>,
    signed: Vec<MemColumn<i64>>,
    float: Vec<MemColumn<f64>>,
    aliases: Vec<Alias>,
    counter: EventCounter,
    next_row: usize,
    n_rows: usize,
}

impl MemoryRecordSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an unsigned field with one value vector per row.
    pub fn add_unsigned_field(&mut self, name: &str, rows: Vec<Vec<u64>>) {
        self.add_unsigned_field_with_parent(name, None, rows);
    }

    /// Declare an unsigned vector field with a parent length field.
    pub fn add_unsigned_field_with_parent(
        &mut self,
        name: &str,
        parent: Option<&str>,
        rows: Vec<Vec<u64>>,
    ) {
        self.n_rows = self.n_rows.max(rows.len());
        self.unsigned.push(MemColumn {
            handle: FieldHandle::new(name, parent.map(str::to_string)),
            rows,
        });
    }

    /// Declare a signed field with one value vector per row.
    pub fn add_signed_field(&mut self, name: &str, rows: Vec<Vec<i64>>) {
        self.add_signed_field_with_parent(name, None, rows);
    }

    /// Declare a signed vector field with a parent length field.
    pub fn add_signed_field_with_parent(
        &mut self,
        name: &str,
        parent: Option<&str>,
        rows: Vec<Vec<i64>>,
    ) {
        self.n_rows = self.n_rows.max(rows.len());
        self.signed.push(MemColumn {
            handle: FieldHandle::new(name, parent.map(str::to_string)),
            rows,
        });
    }

    /// Declare a floating-point field with one value vector per row.
    pub fn add_float_field(&mut self, name: &str, rows: Vec<Vec<f64>>) {
        self.add_float_field_with_parent(name, None, rows);
    }

    /// Declare a floating-point vector field with a parent length field.
    pub fn add_float_field_with_parent(
        &mut self,
        name: &str,
        parent: Option<&str>,
        rows: Vec<Vec<f64>>,
    ) {
        self.n_rows = self.n_rows.max(rows.len());
        self.float.push(MemColumn {
            handle: FieldHandle::new(name, parent.map(str::to_string)),
            rows,
        });
    }

    /// Register an alias by compiling `expression` against this source.
    pub fn add_alias(&mut self, name: &str, expression: &str) -> Result<()> {
        let compiled = Expression::compile(expression, &*self)?;
        self.aliases.push(Alias::new(name, compiled));
        Ok(())
    }

    /// Number of rows the source will yield.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Reset to the first row, so the source can be scanned again.
    pub fn rewind(&mut self) {
        self.next_row = 0;
    }
}

impl RecordSource for MemoryRecordSource {
    fn has_field(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    fn field_type(&self, name: &str) -> Option<ValueType> {
        if self.unsigned.iter().any(|c| c.handle.name() == name) {
            return Some(ValueType::U64);
        }
        if self.signed.iter().any(|c| c.handle.name() == name) {
            return Some(ValueType::I64);
        }
        if self.float.iter().any(|c| c.handle.name() == name) {
            return Some(ValueType::F64);
        }
        None
    }

    fn unsigned_field(&self, name: &str) -> Option<FieldHandle<u64>> {
        self.unsigned.iter().find(|c| c.handle.name() == name).map(|c| c.handle.clone())
    }

    fn signed_field(&self, name: &str) -> Option<FieldHandle<i64>> {
        self.signed.iter().find(|c| c.handle.name() == name).map(|c| c.handle.clone())
    }

    fn float_field(&self, name: &str) -> Option<FieldHandle<f64>> {
        self.float.iter().find(|c| c.handle.name() == name).map(|c| c.handle.clone())
    }

    fn has_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a.name() == name)
    }

    fn alias(&self, name: &str) -> Option<Alias> {
        self.aliases.iter().find(|a| a.name() == name).cloned()
    }

    fn event_counter(&self) -> EventCounter {
        self.counter.clone()
    }

    fn read(&mut self) -> bool {
        if self.next_row >= self.n_rows {
            return false;
        }
        let row = self.next_row;
        for c in &self.unsigned {
            c.handle.load(c.rows.get(row).map_or(&[][..], Vec::as_slice));
        }
        for c in &self.signed {
            c.handle.load(c.rows.get(row).map_or(&[][..], Vec::as_slice));
        }
        for c in &self.float {
            c.handle.load(c.rows.get(row).map_or(&[][..], Vec::as_slice));
        }
        self.counter.set(row as u64);
        self.next_row += 1;
        true
    }
}
