//! Replays a graph against a concrete input.
//!
//! Nodes run in index order, which is a valid topological order by construction. Each call
//! owns its results table, so one graph can serve many threads at once.

use crate::error::{Error, Result};
use crate::graph::{Graph, Op, Operand};
use crate::value::{Value, ops};

/// Results of one execution, indexed by node.
struct Frame<'a> {
    input: &'a Value,
    results: Vec<Value>,
}

impl<'a> Frame<'a> {
    fn new(input: &'a Value, capacity: usize) -> Self {
        Self {
            input,
            results: Vec::with_capacity(capacity),
        }
    }

    fn resolve(&self, operand: Operand) -> &Value {
        match operand {
            Operand::Input => self.input,
            Operand::Node(id) => &self.results[id.index()],
        }
    }
}

/// Evaluate `graph` on `input`.
///
/// Fails with [`Error::ShapeMismatch`] if `input` does not have the shape the graph was
/// traced with.
pub fn execute(graph: &Graph, input: &Value) -> Result<Value> {
    if input.shape() != graph.input_shape() {
        return Err(Error::ShapeMismatch {
            expected: graph.input_shape(),
            actual: input.shape(),
        });
    }

    let mut frame = Frame::new(input, graph.len());
    for node in graph.nodes() {
        let value = match &node.op {
            Op::Identity(a) => frame.resolve(*a).clone(),
            Op::Constant(literal) => literal.clone(),
            Op::Negate(a) => ops::negate(frame.resolve(*a)),
            Op::Tanh(a) => ops::tanh(frame.resolve(*a)),
            Op::Subtract(a, b) => ops::subtract(frame.resolve(*a), frame.resolve(*b))?,
        };
        tracing::trace!(node = %node.id, value = %value, "executed");
        frame.results.push(value);
    }

    let mut results = frame.results;
    Ok(results.swap_remove(graph.output().index()))
}
