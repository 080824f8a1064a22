use thiserror::Error;

use crate::graph::Operand;
use crate::value::Shape;

/// Everything that can go wrong while tracing or executing a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The traced function asked for an operation outside the supported primitive set.
    #[error("untraceable operation `{op}` with {arity} operand(s)")]
    UntraceableOperation { op: String, arity: usize },
    /// The traced function returned a constant, so its output does not depend on its input.
    #[error("traced function returned a value that does not depend on its input")]
    NonSymbolicReturn,
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },
    /// A symbolic term that this trace never produced, e.g. one kept from an earlier trace.
    #[error("operand {operand} : {shape} does not belong to this trace")]
    ForeignOperand { operand: Operand, shape: Shape },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
