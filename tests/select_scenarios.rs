//! End-to-end evaluation over an in-memory record source: one unsigned
//! scalar field `n` and one floating-point vector field `v`.
//! Row 0: `n = 3`, `v = [1.0, 4.0, 9.0]`. Row 1: `n = 0`, `v = []`.

use approx::assert_relative_eq;
use evsel::{
    EventSelectExpression, Expression, Filler1D, Histogram1D, MemoryRecordSource,
    NumericalExpression, RecordSource, Value, ValueType,
};

fn source() -> MemoryRecordSource {
    let mut src = MemoryRecordSource::new();
    src.add_unsigned_field("n", vec![vec![3], vec![0]]);
    src.add_float_field("v", vec![vec![1.0, 4.0, 9.0], vec![]]);
    src
}

#[test]
fn sqrt_maps_over_the_vector() {
    let mut src = source();
    let e = Expression::compile("sqrt(v)", &src).unwrap();
    assert_eq!(e.root_element_type(), ValueType::F64);

    assert!(src.read());
    assert_eq!(e.size(), 3);
    for (i, want) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        assert_eq!(e.get(i as u32), Value::F64(want));
    }

    assert!(src.read());
    assert_eq!(e.size(), 0);
}

#[test]
fn any_reduces_a_vector_comparison() {
    let mut src = source();
    let e = Expression::compile("any(v > 2)", &src).unwrap();
    assert!(src.read());
    assert_eq!(e.size(), 1);
    assert_eq!(e.get(0), Value::U64(1));
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(0));
}

#[test]
fn sum_over_count_promotes_to_float() {
    let mut src = source();
    let e = Expression::compile("sum(v) / n", &src).unwrap();
    assert_eq!(e.root_element_type(), ValueType::F64);

    assert!(src.read());
    assert_relative_eq!(e.get(0).as_f64(), 14.0 / 3.0);

    // Row 1 divides 0.0 by 0 in the float domain: IEEE NaN.
    assert!(src.read());
    assert!(e.get(0).as_f64().is_nan());
}

#[test]
fn integer_division_and_remainder_by_zero_yield_zero() {
    let mut src = source();
    let div = Expression::compile("7 / (n - 3)", &src).unwrap();
    let rem = Expression::compile("7 % (n - 3)", &src).unwrap();
    assert!(src.read());
    assert_eq!(div.get(0), Value::U64(0));
    assert_eq!(rem.get(0), Value::U64(0));
}

#[test]
fn membership_against_a_constant_list() {
    let mut src = source();
    let e = Expression::compile("n in (1, 3, 5)", &src).unwrap();
    assert_eq!(e.root_element_type(), ValueType::U64);
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(1));
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(0));
}

#[test]
fn conjunction_with_a_vacuous_all() {
    let mut src = source();
    let e = Expression::compile("(n == 3) && all(v >= 1.0)", &src).unwrap();
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(1));
    // Row 1: `all` of an empty vector is vacuously true, but n != 3.
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(0));
}

#[test]
fn exponentiation_binds_tighter_than_addition() {
    let mut src = source();
    let e = Expression::compile("2 ^ 10 + 1", &src).unwrap();
    assert!(src.read());
    assert_eq!(e.get(0).as_f64(), 1025.0);
}

#[test]
fn unary_minus_on_a_field_filters_on_truthiness() {
    let mut src = source();
    let e = Expression::compile("-n + 1", &src).unwrap();
    let filt = EventSelectExpression::new("-n + 1", &src).unwrap();

    assert!(src.read());
    assert_eq!(e.get(0), Value::I64(-2));
    assert!(filt.select());

    assert!(src.read());
    assert_eq!(e.get(0), Value::I64(1));
    assert!(filt.select());
}

#[test]
fn broadcast_law_for_scalar_against_vector() {
    let mut src = source();
    let scalar_lhs = Expression::compile("n * v", &src).unwrap();
    let vector_only = Expression::compile("v", &src).unwrap();
    assert!(src.read());
    assert_eq!(scalar_lhs.size(), 3);
    for i in 0..3 {
        assert_eq!(
            scalar_lhs.get(i).as_f64(),
            3.0 * vector_only.get(i).as_f64()
        );
    }
}

#[test]
fn counter_is_reserved_and_monotonic() {
    let mut src = source();
    let e = Expression::compile("currentEventNumber", &src).unwrap();
    let mut seen = Vec::new();
    while src.read() {
        seen.push(e.get(0).as_u64());
    }
    assert_eq!(seen, vec![0, 1]);
}

#[test]
fn aliases_nest_through_expressions() {
    let mut src = source();
    src.add_alias("v_sum", "sum(v)").unwrap();
    src.add_alias("v_mean", "v_sum / unique(v)").unwrap();
    assert!(src.has_alias("v_mean"));

    let e = Expression::compile("v_mean", &src).unwrap();
    assert!(src.read());
    assert_relative_eq!(e.get(0).as_f64(), 14.0 / 3.0);
}

#[test]
fn alias_metadata_follows_the_head_node() {
    let mut src = MemoryRecordSource::new();
    src.add_float_field_with_parent("hit_charge", Some("n_hits"), vec![vec![1.0, 2.0]]);
    src.add_alias("q", "hit_charge").unwrap();

    let alias = src.alias("q").unwrap();
    assert_eq!(alias.name(), "q");
    assert!(alias.has_parent());
    assert_eq!(alias.parent_name(), Some("n_hits"));
}

#[test]
fn cast_round_trip_and_idempotence() {
    let mut src = source();
    let round = Expression::compile("unsigned(float(n))", &src).unwrap();
    let once = Expression::compile("int(v)", &src).unwrap();
    let twice = Expression::compile("int(int(v))", &src).unwrap();
    assert!(src.read());
    assert_eq!(round.get(0), Value::U64(3));
    for i in 0..3 {
        assert_eq!(once.get(i), twice.get(i));
    }
    assert_eq!(once.get(2), Value::I64(9));
}

#[test]
fn comma_variants_parse_identically() {
    let src = source();
    for text in ["in(n, (1, 3, 5))", "in(n, (, 1, 3, 5))", "in(n, (1, 3, 5,))"] {
        let e = Expression::compile(text, &src).unwrap();
        assert_eq!(e.root_element_type(), ValueType::U64, "{text}");
    }
}

#[test]
fn bitwise_operators_on_integers() {
    let mut src = source();
    let e = Expression::compile("(n | 8) & 12", &src).unwrap();
    assert!(src.read());
    assert_eq!(e.get(0), Value::U64(8));

    let e = Expression::compile("~n & 0xFF", &src).unwrap();
    assert_eq!(e.get(0), Value::U64(0xFC));
}

#[test]
fn numerical_projection_feeds_a_histogram() {
    let mut src = source();
    let mut h = Histogram1D::new(5, 0.0, 5.0).unwrap();
    Filler1D::weighted("sqrt(v)", "n").fill(&mut h, &mut src).unwrap();
    // Row 0 projects sqrt(v).get(0) = 1.0 with weight 3; row 1 is empty.
    assert_eq!(h.data(1), 3.0);
    let filled: f64 = (0..5).map(|i| h.data(i)).sum();
    assert_eq!(filled + h.underflow() + h.overflow(), 3.0);
}

#[test]
fn numerical_expression_is_none_on_empty_rows() {
    let mut src = source();
    let ne = NumericalExpression::new("v * 2", &src).unwrap();
    assert!(src.read());
    assert_eq!(ne.evaluate(), Some(2.0));
    assert!(src.read());
    assert_eq!(ne.evaluate(), None);
}

#[test]
fn compilation_is_deterministic_for_a_schema() {
    let mut src = source();
    let a = Expression::compile("any(v > 2) && n in (3, 5)", &src).unwrap();
    let b = Expression::compile("any(v > 2) && n in (3, 5)", &src).unwrap();
    while src.read() {
        assert_eq!(a.get(0), b.get(0));
        assert_eq!(a.size(), b.size());
    }
}

#[test]
fn whitespace_variants_tokenize_alike() {
    let mut src = source();
    let tight = Expression::compile("n==3&&any(v>2.)", &src).unwrap();
    let airy = Expression::compile("  n == 3\t&&\n any( v > 2. ) ", &src).unwrap();
    assert!(src.read());
    assert_eq!(tight.get(0), airy.get(0));
    assert_eq!(tight.get(0), Value::U64(1));
}
