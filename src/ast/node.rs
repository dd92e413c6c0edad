// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Literal definitions
//!
//! A [`Literal`] is a shared handle to one node of an expression DAG. Handles
//! compare by identity: two arguments with the same name are different
//! literals unless they are clones of the same handle.

use super::equation::Equation;
use super::function::{BinaryOp, Function};
use super::partition::{Entry, Generator, Partition, PartitionSource};
use super::value::{Output, Reducer, TagSet, Value};
use crate::error::{EquationError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to a DAG node
#[derive(Clone)]
pub struct Literal(pub(crate) Arc<LiteralNode>);

pub(crate) struct LiteralNode {
    pub(crate) name: String,
    pub(crate) kind: LiteralKind,
    pub(crate) state: RwLock<NodeState>,
    pub(crate) parents: RwLock<Vec<Weak<LiteralNode>>>,
}

/// Cache bookkeeping for one node
#[derive(Debug)]
pub(crate) struct NodeState {
    pub(crate) cache: Option<Output>,
    pub(crate) dirty: bool,
    /// Bumped every time an invalidation reaches the node
    pub(crate) stamp: u64,
    pub(crate) evaluations: u64,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            cache: None,
            dirty: true,
            stamp: 0,
            evaluations: 0,
        }
    }
}

/// Node taxonomy
pub enum LiteralKind {
    Argument(Argument),
    Operator(Operator),
    Partition(Partition),
    Generator(Generator),
    Equation(EquationCall),
}

impl LiteralKind {
    pub fn label(&self) -> &'static str {
        match self {
            LiteralKind::Argument(a) if a.constant => "constant",
            LiteralKind::Argument(_) => "argument",
            LiteralKind::Operator(_) => "operator",
            LiteralKind::Partition(_) => "partition",
            LiteralKind::Generator(_) => "generator",
            LiteralKind::Equation(_) => "equation",
        }
    }
}

/// Leaf holding a mutable value
pub struct Argument {
    pub(crate) value: RwLock<Value>,
    pub(crate) constant: bool,
}

/// What an operator node computes
#[derive(Debug, Clone)]
pub enum Operation {
    /// Elementwise application of a function to every child
    Function(Function),
    /// Binary operation restricted to partition entries selected by `tag`
    Tagged {
        op: BinaryOp,
        tag: String,
        combine: Option<Reducer>,
    },
}

/// Interior node applying an operation to its children
pub struct Operator {
    pub(crate) operation: Operation,
    pub(crate) children: Vec<Literal>,
}

impl Operator {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn children(&self) -> &[Literal] {
        &self.children
    }
}

/// An equation embedded as a node, with one binding per free argument
pub struct EquationCall {
    pub(crate) equation: Equation,
    pub(crate) bindings: Vec<Literal>,
}

impl EquationCall {
    pub fn equation(&self) -> &Equation {
        &self.equation
    }

    pub fn bindings(&self) -> &[Literal] {
        &self.bindings
    }
}

impl Literal {
    fn from_kind(name: impl Into<String>, kind: LiteralKind) -> Self {
        Literal(Arc::new(LiteralNode {
            name: name.into(),
            kind,
            state: RwLock::new(NodeState::default()),
            parents: RwLock::new(Vec::new()),
        }))
    }

    /// Creates a node and registers it as parent of each of its children.
    fn with_children(name: impl Into<String>, kind: LiteralKind) -> Self {
        let literal = Self::from_kind(name, kind);
        for child in literal.children() {
            child.link_parent(&literal);
        }
        literal
    }

    /// A free argument
    pub fn argument(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_kind(
            name,
            LiteralKind::Argument(Argument {
                value: RwLock::new(value.into()),
                constant: false,
            }),
        )
    }

    /// A const argument: evaluated like any argument, never listed as free
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_kind(
            name,
            LiteralKind::Argument(Argument {
                value: RwLock::new(value.into()),
                constant: true,
            }),
        )
    }

    /// Applies `function` to `children`, checking arity eagerly.
    pub fn operator(function: Function, children: Vec<Literal>) -> Result<Self> {
        function.check_arity(children.len())?;
        let name = function.name().to_string();
        Ok(Self::with_children(
            name,
            LiteralKind::Operator(Operator {
                operation: Operation::Function(function),
                children,
            }),
        ))
    }

    /// Applies an elementwise one-operand function; cannot fail arity.
    pub fn unary(name: impl Into<String>, f: fn(f64) -> f64, operand: Literal) -> Self {
        let function = Function::unary(name, f);
        Self::with_children(
            function.name().to_string(),
            LiteralKind::Operator(Operator {
                operation: Operation::Function(function),
                children: vec![operand],
            }),
        )
    }

    pub fn binary(op: BinaryOp, lhs: Literal, rhs: Literal) -> Self {
        Self::with_children(
            op.name(),
            LiteralKind::Operator(Operator {
                operation: Operation::Function(Function::binary(op)),
                children: vec![lhs, rhs],
            }),
        )
    }

    /// Tag-scoped binary operation.
    ///
    /// `combine` collapses every entry, selected or not, with the given reducer.
    pub fn tagged(
        op: BinaryOp,
        lhs: Literal,
        rhs: Literal,
        tag: impl Into<String>,
        combine: Option<Reducer>,
    ) -> Self {
        let tag = tag.into();
        Self::with_children(
            format!("{}[{}]", op.name(), tag),
            LiteralKind::Operator(Operator {
                operation: Operation::Tagged { op, tag, combine },
                children: vec![lhs, rhs],
            }),
        )
    }

    /// An empty partition; entries are added with [`Literal::add_entry`].
    pub fn partition(name: impl Into<String>) -> Self {
        Self::from_kind(name, LiteralKind::Partition(Partition::default()))
    }

    /// A generator re-deriving its entries from `source` on every call.
    pub fn generator(name: impl Into<String>, source: impl PartitionSource + 'static) -> Self {
        Self::from_kind(name, LiteralKind::Generator(Generator::new(Arc::new(source))))
    }

    /// A generator mirroring the current membership of another literal
    pub fn generator_of(name: impl Into<String>, literal: &Literal) -> Self {
        Self::generator(name, literal.clone())
    }

    /// Embeds `equation` as a node, binding its free arguments to `bindings`.
    pub fn equation_call(equation: &Equation, bindings: Vec<Literal>) -> Result<Self> {
        let expected = equation.args().len();
        if bindings.len() != expected {
            return Err(EquationError::arity(equation.name(), expected, expected, bindings.len()));
        }
        let root = equation.root();
        if bindings.iter().any(|b| b == root || b.contains(root)) {
            return Err(EquationError::Cycle {
                name: equation.name().to_string(),
            });
        }
        Ok(Self::with_children(
            equation.name(),
            LiteralKind::Equation(EquationCall {
                equation: equation.clone(),
                bindings,
            }),
        ))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &LiteralKind {
        &self.0.kind
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.0.kind, LiteralKind::Argument(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(&self.0.kind, LiteralKind::Argument(a) if a.constant)
    }

    /// Current value of an argument
    pub fn value(&self) -> Option<Value> {
        match &self.0.kind {
            LiteralKind::Argument(a) => Some(read(&a.value).clone()),
            _ => None,
        }
    }

    /// Assigns an argument and invalidates every dependent node.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        match &self.0.kind {
            LiteralKind::Argument(a) if !a.constant => {
                *write(&a.value) = value.into();
                self.mark_dirty();
                Ok(())
            }
            _ => Err(EquationError::Constraint {
                name: self.name().to_string(),
            }),
        }
    }

    /// Adds an entry to a partition. Tags cannot change afterwards.
    pub fn add_entry<I, S>(&self, literal: &Literal, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let LiteralKind::Partition(partition) = &self.0.kind else {
            return Err(EquationError::lookup(format!("partition '{}'", self.name())));
        };
        if literal == self || literal.contains(self) {
            return Err(EquationError::Cycle {
                name: self.name().to_string(),
            });
        }
        write(&partition.entries).push(Entry {
            literal: literal.clone(),
            tags: tags.into_iter().collect::<TagSet>(),
        });
        literal.link_parent(self);
        self.mark_dirty();
        Ok(())
    }

    /// Entries of a partition or generator, in order
    pub fn entries(&self) -> Vec<Entry> {
        match &self.0.kind {
            LiteralKind::Partition(p) => read(&p.entries).clone(),
            LiteralKind::Generator(g) => read(&g.entries).clone(),
            _ => Vec::new(),
        }
    }

    /// True if the cache must be recomputed on the next evaluation
    pub fn is_dirty(&self) -> bool {
        read(&self.0.state).dirty
    }

    /// Number of times this node has been recomputed
    pub fn evaluations(&self) -> u64 {
        read(&self.0.state).evaluations
    }

    pub(crate) fn ptr_eq(&self, other: &Literal) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state)
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            LiteralKind::Argument(a) => f
                .debug_struct(self.0.kind.label())
                .field("name", &self.0.name)
                .field("value", &*read(&a.value))
                .finish(),
            LiteralKind::Operator(op) => f
                .debug_struct("operator")
                .field("name", &self.0.name)
                .field("children", &op.children)
                .finish(),
            kind => f
                .debug_struct(kind.label())
                .field("name", &self.0.name)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_name() {
        let a = Literal::argument("a", 1.0);
        let b = Literal::argument("a", 1.0);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_constant_rejects_assignment() {
        let c = Literal::constant("c", 2.0);
        assert!(matches!(c.set_value(3.0), Err(EquationError::Constraint { .. })));
        assert_eq!(c.value(), Some(Value::Scalar(2.0)));
    }

    #[test]
    fn test_operator_arity_checked_eagerly() {
        let x = Literal::argument("x", 1.0);
        let sin = Function::unary("sin", f64::sin);
        let err = Literal::operator(sin, vec![x.clone(), x]).unwrap_err();
        assert!(matches!(err, EquationError::Arity { .. }));
    }

    #[test]
    fn test_partition_rejects_self_reference() {
        let p = Literal::partition("p");
        let v = Literal::argument("v", 1.0);
        p.add_entry(&v, ["t"]).unwrap();

        let scaled = Literal::binary(BinaryOp::Multiply, v.clone(), p.clone());
        assert!(matches!(p.add_entry(&scaled, Vec::<String>::new()), Err(EquationError::Cycle { .. })));
        assert!(matches!(p.add_entry(&p, ["t"]), Err(EquationError::Cycle { .. })));
        assert_eq!(p.entries().len(), 1);
    }
}
