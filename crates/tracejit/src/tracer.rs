//! Tracing: run a function once against a symbolic input and record what it does.
//!
//! The function never sees real numbers. It receives a [`Symbolic`] placeholder and a
//! [`TraceSession`]; every primitive it calls on the session appends an [`OpNode`] and hands
//! back a new symbolic term. Constants stay plain [`Value`]s until they meet a symbolic term.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId, Op, OpNode, Operand};
use crate::value::{Shape, Value, ops};

/// A placeholder for a value that only exists once the graph runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbolic {
    operand: Operand,
    shape: Shape,
}

impl Symbolic {
    pub fn operand(&self) -> Operand {
        self.operand
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// What a traced function computes with: a symbolic placeholder or a known constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Symbolic(Symbolic),
    Constant(Value),
}

impl Term {
    pub fn shape(&self) -> Shape {
        match self {
            Term::Symbolic(symbolic) => symbolic.shape,
            Term::Constant(value) => value.shape(),
        }
    }

    pub fn as_symbolic(&self) -> Option<Symbolic> {
        match self {
            Term::Symbolic(symbolic) => Some(*symbolic),
            Term::Constant(_) => None,
        }
    }
}

impl From<Symbolic> for Term {
    fn from(symbolic: Symbolic) -> Self {
        Term::Symbolic(symbolic)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Constant(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::Constant(Value::Scalar(value))
    }
}

/// Recording context for a single trace. Passed explicitly into every primitive.
pub struct TraceSession {
    input_shape: Shape,
    nodes: Vec<OpNode>,
    /// Materialized constants by shape and bit pattern
    constants: FxHashMap<(Shape, Vec<u64>), NodeId>,
}

impl TraceSession {
    fn new(input_shape: Shape) -> Self {
        Self {
            input_shape,
            nodes: Vec::new(),
            constants: FxHashMap::default(),
        }
    }

    /// The symbolic stand-in for the traced input.
    pub fn input(&self) -> Symbolic {
        Symbolic {
            operand: Operand::Input,
            shape: self.input_shape,
        }
    }

    /// Number of nodes recorded so far.
    pub fn recorded(&self) -> usize {
        self.nodes.len()
    }

    pub fn negate(&mut self, a: impl Into<Term>) -> Result<Term> {
        match a.into() {
            Term::Constant(value) => Ok(Term::Constant(ops::negate(&value))),
            Term::Symbolic(a) => {
                let operand = self.operand(a)?;
                Ok(self.push(Op::Negate(operand), a.shape))
            }
        }
    }

    pub fn tanh(&mut self, a: impl Into<Term>) -> Result<Term> {
        match a.into() {
            Term::Constant(value) => Ok(Term::Constant(ops::tanh(&value))),
            Term::Symbolic(a) => {
                let operand = self.operand(a)?;
                Ok(self.push(Op::Tanh(operand), a.shape))
            }
        }
    }

    /// `a - b`. Both terms must have the same shape.
    pub fn subtract(&mut self, a: impl Into<Term>, b: impl Into<Term>) -> Result<Term> {
        let (a, b) = (a.into(), b.into());
        if a.shape() != b.shape() {
            return Err(Error::ShapeMismatch {
                expected: a.shape(),
                actual: b.shape(),
            });
        }
        if let (Term::Constant(a), Term::Constant(b)) = (&a, &b) {
            return ops::subtract(a, b).map(Term::Constant);
        }
        let shape = a.shape();
        let a = self.materialize(a)?;
        let b = self.materialize(b)?;
        Ok(self.push(Op::Subtract(a, b), shape))
    }

    /// `a - tanh(a)`, lowered to primitives.
    pub fn tanhshrink(&mut self, a: impl Into<Term>) -> Result<Term> {
        let a = a.into();
        let tanh = self.tanh(a.clone())?;
        self.subtract(a, tanh)
    }

    /// Dispatch a primitive by name. Unknown names and wrong operand counts are untraceable.
    pub fn call(&mut self, name: &str, args: &[Term]) -> Result<Term> {
        match (name, args) {
            ("negate" | "neg", [a]) => self.negate(a.clone()),
            ("tanh", [a]) => self.tanh(a.clone()),
            ("subtract" | "sub", [a, b]) => self.subtract(a.clone(), b.clone()),
            ("tanhshrink", [a]) => self.tanhshrink(a.clone()),
            _ => {
                tracing::debug!(op = name, arity = args.len(), "rejecting untraceable operation");
                Err(Error::UntraceableOperation {
                    op: name.to_string(),
                    arity: args.len(),
                })
            }
        }
    }

    /// Check that `symbolic` was handed out by this session: it names the input or an
    /// already recorded node, with the shape recorded for it.
    fn operand(&self, symbolic: Symbolic) -> Result<Operand> {
        let recorded = match symbolic.operand {
            Operand::Input => Some(self.input_shape),
            Operand::Node(id) => self.nodes.get(id.index()).map(|node| node.shape),
        };
        if recorded != Some(symbolic.shape) {
            tracing::debug!(
                operand = %symbolic.operand,
                shape = %symbolic.shape,
                recorded = self.nodes.len(),
                "rejecting operand from another trace"
            );
            return Err(Error::ForeignOperand {
                operand: symbolic.operand,
                shape: symbolic.shape,
            });
        }
        Ok(symbolic.operand)
    }

    /// Turn a term into an operand, recording constants the first time they are used.
    fn materialize(&mut self, term: Term) -> Result<Operand> {
        match term {
            Term::Symbolic(symbolic) => self.operand(symbolic),
            Term::Constant(value) => {
                let key = value.bit_key();
                let id = match self.constants.get(&key).copied() {
                    Some(id) => id,
                    None => {
                        let shape = value.shape();
                        let id = self.record(Op::Constant(value), shape);
                        self.constants.insert(key, id);
                        id
                    }
                };
                Ok(Operand::Node(id))
            }
        }
    }

    fn record(&mut self, op: Op, shape: Shape) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = OpNode { id, op, shape };
        tracing::trace!(node = %node, "recorded");
        self.nodes.push(node);
        id
    }

    fn push(&mut self, op: Op, shape: Shape) -> Term {
        let id = self.record(op, shape);
        Term::Symbolic(Symbolic {
            operand: Operand::Node(id),
            shape,
        })
    }

    fn finish(mut self, output: Term) -> Result<Graph> {
        let Term::Symbolic(output) = output else {
            return Err(Error::NonSymbolicReturn);
        };
        let output = match self.operand(output)? {
            Operand::Node(id) => id,
            Operand::Input => self.record(Op::Identity(Operand::Input), output.shape),
        };
        Graph::new(self.input_shape, self.nodes, output)
    }
}

/// Trace `f` once on a placeholder of `input_shape` and return the recorded graph.
///
/// A failed trace (including an error returned by `f` itself) produces no graph.
pub fn trace<F>(input_shape: Shape, f: F) -> Result<Graph>
where
    F: FnOnce(&mut TraceSession, Symbolic) -> Result<Term>,
{
    let mut session = TraceSession::new(input_shape);
    let input = session.input();
    let output = f(&mut session, input)?;
    let graph = session.finish(output)?;
    tracing::debug!(
        input_shape = %graph.input_shape(),
        nodes = graph.len(),
        output = %graph.output(),
        "trace complete"
    );
    Ok(graph)
}
