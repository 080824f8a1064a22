//! The recorded, immutable intermediate representation.
//!
//! A graph is a flat list of [`OpNode`]s in trace order. Operands only ever point at the
//! traced input or at an earlier node, so the list is already topologically sorted.

use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use std::fmt;

use crate::error::{Error, Result};
use crate::value::{Shape, Value};

/// Position of a node in its graph. Also its execution order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Where an operation reads one of its arguments from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operand {
    /// The traced input
    Input,
    Node(NodeId),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Input => write!(f, "%input"),
            Operand::Node(id) => write!(f, "{id}"),
        }
    }
}

/// Closed set of operation kinds, without their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpKind {
    Identity,
    Constant,
    Negate,
    Tanh,
    Subtract,
}

impl OpKind {
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Identity => "identity",
            OpKind::Constant => "constant",
            OpKind::Negate => "negate",
            OpKind::Tanh => "tanh",
            OpKind::Subtract => "subtract",
        }
    }

    /// Number of operands the kind takes.
    pub fn arity(self) -> usize {
        match self {
            OpKind::Constant => 0,
            OpKind::Identity | OpKind::Negate | OpKind::Tanh => 1,
            OpKind::Subtract => 2,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An operation together with its operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Op {
    /// Forwards its operand. Only recorded when a function returns its input unchanged.
    Identity(Operand),
    Constant(Value),
    Negate(Operand),
    Tanh(Operand),
    Subtract(Operand, Operand),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Identity(_) => OpKind::Identity,
            Op::Constant(_) => OpKind::Constant,
            Op::Negate(_) => OpKind::Negate,
            Op::Tanh(_) => OpKind::Tanh,
            Op::Subtract(..) => OpKind::Subtract,
        }
    }

    pub fn operands(&self) -> SmallVec<[Operand; 2]> {
        match self {
            Op::Constant(_) => SmallVec::new(),
            Op::Identity(a) | Op::Negate(a) | Op::Tanh(a) => smallvec![*a],
            Op::Subtract(a, b) => smallvec![*a, *b],
        }
    }
}

/// One recorded primitive operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpNode {
    pub id: NodeId,
    pub op: Op,
    /// Result shape inferred while tracing
    pub shape: Shape,
}

impl OpNode {
    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Whether every operand is the input or a node recorded before this one.
    fn reads_backwards(&self) -> bool {
        self.op.operands().iter().all(|operand| match operand {
            Operand::Input => true,
            Operand::Node(id) => *id < self.id,
        })
    }
}

impl fmt::Display for OpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {} = {}(", self.id, self.shape, self.kind())?;
        match &self.op {
            Op::Constant(value) => write!(f, "{value}")?,
            op => {
                for (index, operand) in op.operands().iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
            }
        }
        write!(f, ")")
    }
}

/// Immutable, ordered record of a traced computation.
///
/// Equality is structural: same input shape, same node sequence, same output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    input_shape: Shape,
    nodes: Vec<OpNode>,
    output: NodeId,
}

impl Graph {
    /// Only the tracer builds graphs. Executing relies on the checks made here: operands read
    /// backwards and the output is one of the nodes.
    pub(crate) fn new(input_shape: Shape, nodes: Vec<OpNode>, output: NodeId) -> Result<Self> {
        let graph = Self {
            input_shape,
            nodes,
            output,
        };
        let misplaced = graph
            .nodes
            .iter()
            .enumerate()
            .find(|(index, node)| node.id.index() != *index || !node.reads_backwards());
        if let Some((_, node)) = misplaced {
            let operand = node
                .op
                .operands()
                .into_iter()
                .find(|operand| matches!(operand, Operand::Node(id) if *id >= node.id))
                .unwrap_or(Operand::Node(node.id));
            return Err(Error::ForeignOperand {
                operand,
                shape: node.shape,
            });
        }
        if graph.output.index() >= graph.nodes.len() {
            return Err(Error::ForeignOperand {
                operand: Operand::Node(graph.output),
                shape: input_shape,
            });
        }
        Ok(graph)
    }

    pub fn input_shape(&self) -> Shape {
        self.input_shape
    }

    pub fn nodes(&self) -> &[OpNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&OpNode> {
        self.nodes.get(id.index())
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Shape of the value the graph produces.
    pub fn output_shape(&self) -> Shape {
        self.nodes[self.output.index()].shape
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node sits at its own index and reads only the input or earlier nodes.
    pub fn is_topologically_ordered(&self) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .all(|(index, node)| node.id.index() == index && node.reads_backwards())
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph(%input : {}):", self.input_shape)?;
        for node in &self.nodes {
            writeln!(f, "  {node}")?;
        }
        write!(f, "  return {}", self.output)
    }
}
