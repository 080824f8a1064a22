//! Sample functions and assertions shared by the integration tests.

#![allow(dead_code)]

use tracejit::{Result, Symbolic, Term, TraceSession, Value};

/// `y - tanh(y)`
pub fn tanhshrink(session: &mut TraceSession, y: Symbolic) -> Result<Term> {
    let t = session.tanh(y)?;
    session.subtract(y, t)
}

/// `tanh(-y) - (y - tanh(y))`
pub fn mixed(session: &mut TraceSession, y: Symbolic) -> Result<Term> {
    let n = session.negate(y)?;
    let t = session.tanh(n)?;
    let shrunk = session.tanhshrink(y)?;
    session.subtract(t, shrunk)
}

/// `-(tanh(tanh(y)))`
pub fn nested(session: &mut TraceSession, y: Symbolic) -> Result<Term> {
    let inner = session.tanh(y)?;
    let outer = session.tanh(inner)?;
    session.negate(outer)
}

pub fn tanhshrink_reference(y: f64) -> f64 {
    y - y.tanh()
}

pub fn mixed_reference(y: f64) -> f64 {
    (-y).tanh() - (y - y.tanh())
}

pub fn nested_reference(y: f64) -> f64 {
    -(y.tanh().tanh())
}

pub fn sample_inputs() -> Vec<f64> {
    vec![-20.0, -3.5, -1.0, -1e-9, 0.0, 1e-9, 0.25, 1.0, 2.0, 7.5, 40.0]
}

/// Relative comparison with an absolute floor near zero.
pub fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_close_value(actual: &Value, expected: &[f64]) {
    let actual = actual.as_slice().expect("vector output");
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_close(*a, *e);
    }
}
