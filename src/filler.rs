//! Drive a record source through compiled expressions to fill
//! histograms.
//!
//! A filler holds expression strings; `fill` compiles them against the
//! given source, then pulls rows until the source is exhausted. Rows
//! where any projection evaluates to an empty vector are skipped.

use crate::error::Result;
use crate::expr::NumericalExpression;
use crate::histogram::{Histogram1D, Histogram2D};
use crate::record::RecordSource;

/// Fills a 1-D histogram from a value expression and an optional
/// weight expression.
#[derive(Debug, Clone)]
pub struct Filler1D {
    value_expr: String,
    weight_expr: Option<String>,
}

impl Filler1D {
    /// Unweighted filler (every row counts with weight 1).
    pub fn new(value_expr: impl Into<String>) -> Self {
        Filler1D { value_expr: value_expr.into(), weight_expr: None }
    }

    /// Filler with a per-row weight expression.
    pub fn weighted(value_expr: impl Into<String>, weight_expr: impl Into<String>) -> Self {
        Filler1D { value_expr: value_expr.into(), weight_expr: Some(weight_expr.into()) }
    }

    /// Compile against `source` and fill until the source is exhausted.
    pub fn fill(&self, hist: &mut Histogram1D, source: &mut dyn RecordSource) -> Result<()> {
        let value = NumericalExpression::new(&self.value_expr, &*source)?;
        let weight = match &self.weight_expr {
            Some(w) => Some(NumericalExpression::new(w, &*source)?),
            None => None,
        };
        while source.read() {
            let w = match &weight {
                Some(we) => match we.evaluate() {
                    Some(w) => w,
                    None => continue,
                },
                None => 1.0,
            };
            if let Some(x) = value.evaluate() {
                hist.fill(x, w);
            }
        }
        Ok(())
    }
}

/// Fills a 2-D histogram from two value expressions and an optional
/// weight expression.
#[derive(Debug, Clone)]
pub struct Filler2D {
    x_expr: String,
    y_expr: String,
    weight_expr: Option<String>,
}

impl Filler2D {
    /// Unweighted filler (every row counts with weight 1).
    pub fn new(x_expr: impl Into<String>, y_expr: impl Into<String>) -> Self {
        Filler2D { x_expr: x_expr.into(), y_expr: y_expr.into(), weight_expr: None }
    }

    /// Filler with a per-row weight expression.
    pub fn weighted(
        x_expr: impl Into<String>,
        y_expr: impl Into<String>,
        weight_expr: impl Into<String>,
    ) -> Self {
        Filler2D {
            x_expr: x_expr.into(),
            y_expr: y_expr.into(),
            weight_expr: Some(weight_expr.into()),
        }
    }

    /// Compile against `source` and fill until the source is exhausted.
    pub fn fill(&self, hist: &mut Histogram2D, source: &mut dyn RecordSource) -> Result<()> {
        let x = NumericalExpression::new(&self.x_expr, &*source)?;
        let y = NumericalExpression::new(&self.y_expr, &*source)?;
        let weight = match &self.weight_expr {
            Some(w) => Some(NumericalExpression::new(w, &*source)?),
            None => None,
        };
        while source.read() {
            let w = match &weight {
                Some(we) => match we.evaluate() {
                    Some(w) => w,
                    None => continue,
                },
                None => 1.0,
            };
            if let (Some(x), Some(y)) = (x.evaluate(), y.evaluate()) {
                hist.fill(x, y, w);
            }
        }
        Ok(())
    }
}
