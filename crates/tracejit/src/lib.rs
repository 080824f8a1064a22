//! Trace-based graph compiler for single-input elementwise numeric functions.
//!
//! A function is traced once against a symbolic input, producing an immutable [`Graph`]
//! of primitive operations (`negate`, `tanh`, `subtract`). The graph is then executed on
//! concrete inputs without calling the function again.
//!
//! ```
//! use tracejit::{Value, compile};
//!
//! let tanhshrink = compile(|session, y| {
//!     let t = session.tanh(y)?;
//!     session.subtract(y, t)
//! })?;
//!
//! println!("{}", tanhshrink.describe());
//! let out = tanhshrink.run(&Value::scalar(1.0))?;
//! assert!((out.as_scalar().unwrap() - (1.0 - 1.0f64.tanh())).abs() < 1e-12);
//! # Ok::<(), tracejit::Error>(())
//! ```

pub mod error;
pub mod executor;
pub mod graph;
pub mod tracer;
pub mod value;

pub use error::{Error, Result};
pub use executor::execute;
pub use graph::{Graph, NodeId, Op, OpKind, OpNode, Operand};
pub use tracer::{Symbolic, Term, TraceSession, trace};
pub use value::{Shape, Value};

/// A traced function: owns its graph and runs it on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    graph: Graph,
}

impl CompiledFunction {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn input_shape(&self) -> Shape {
        self.graph.input_shape()
    }

    /// Human-readable listing of the graph, one node per line, output last.
    pub fn describe(&self) -> String {
        self.graph.to_string()
    }

    /// Execute the graph on `input`. The input must have the traced shape.
    pub fn run(&self, input: &Value) -> Result<Value> {
        execute(&self.graph, input)
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// Trace `f` on a scalar input.
pub fn compile<F>(f: F) -> Result<CompiledFunction>
where
    F: FnOnce(&mut TraceSession, Symbolic) -> Result<Term>,
{
    compile_with_shape(Shape::Scalar, f)
}

/// Trace `f` on an input of the given shape. Later runs must use the same shape.
pub fn compile_with_shape<F>(shape: Shape, f: F) -> Result<CompiledFunction>
where
    F: FnOnce(&mut TraceSession, Symbolic) -> Result<Term>,
{
    let graph = trace(shape, f)?;
    tracing::debug!(input_shape = %shape, nodes = graph.len(), "compiled");
    Ok(CompiledFunction::new(graph))
}
