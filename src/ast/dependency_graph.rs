// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Dependency tracking between literals
//!
//! Children are owned by their parents; parents are reached through weak
//! back-links so that invalidation can walk upward from a changed argument.

use super::node::{read, write, Literal, LiteralKind, Operation};
use crate::error::{EquationError, Result};
use ahash::AHashSet;
use std::sync::{Arc, Weak};

impl Literal {
    /// Structural children, in evaluation order.
    ///
    /// A wrapped equation depends on its bindings and on the wrapped root.
    pub fn children(&self) -> Vec<Literal> {
        match self.kind() {
            LiteralKind::Argument(_) => Vec::new(),
            LiteralKind::Operator(op) => op.children.clone(),
            LiteralKind::Partition(p) => read(&p.entries).iter().map(|e| e.literal.clone()).collect(),
            LiteralKind::Generator(g) => read(&g.entries).iter().map(|e| e.literal.clone()).collect(),
            LiteralKind::Equation(call) => {
                let mut children = call.bindings.clone();
                children.push(call.equation.root().clone());
                children
            }
        }
    }

    /// Live parents of this node
    pub fn parents(&self) -> Vec<Literal> {
        read(&self.0.parents)
            .iter()
            .filter_map(Weak::upgrade)
            .map(Literal)
            .collect()
    }

    pub(crate) fn link_parent(&self, parent: &Literal) {
        let mut parents = write(&self.0.parents);
        parents.retain(|p| p.strong_count() > 0);
        let target = Arc::downgrade(&parent.0);
        if !parents.iter().any(|p| p.ptr_eq(&target)) {
            parents.push(target);
        }
    }

    pub(crate) fn unlink_parent(&self, parent: &Literal) {
        let target = Arc::downgrade(&parent.0);
        write(&self.0.parents).retain(|p| !p.ptr_eq(&target) && p.strong_count() > 0);
    }

    /// Invalidates this node and every ancestor.
    ///
    /// The walk stops at nodes that are already dirty: their ancestors are
    /// dirty as well. Each node reached has its stamp bumped, which lets an
    /// in-flight evaluation notice that its inputs moved underneath it and
    /// carry the invalidation upward once it finishes.
    pub fn mark_dirty(&self) {
        let mut stack = vec![self.0.clone()];
        while let Some(node) = stack.pop() {
            {
                let mut state = write(&node.state);
                state.stamp = state.stamp.wrapping_add(1);
                if state.dirty {
                    continue;
                }
                state.dirty = true;
            }
            stack.extend(read(&node.parents).iter().filter_map(Weak::upgrade));
        }
    }

    /// True if `target` is reachable below this node
    pub fn contains(&self, target: &Literal) -> bool {
        let mut visited = AHashSet::new();
        let mut stack = self.children();
        while let Some(node) = stack.pop() {
            if node == *target {
                return true;
            }
            if visited.insert(node.clone()) {
                stack.extend(node.children());
            }
        }
        false
    }

    /// Depth-first walk in encounter order, visiting each node once.
    ///
    /// Wrapped equations contribute their bindings only: the wrapped
    /// equation's own arguments are rebound at call time.
    pub fn walk(&self, mut visit: impl FnMut(&Literal)) {
        let mut visited = AHashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            visit(&node);
            let children = match node.kind() {
                LiteralKind::Equation(call) => call.bindings.clone(),
                _ => node.children(),
            };
            stack.extend(children.into_iter().rev());
        }
    }

    /// Free arguments reachable from this node, first-encounter order, no duplicates
    pub fn identify(&self) -> Vec<Literal> {
        let mut args = Vec::new();
        self.walk(|node| {
            if node.is_argument() && !node.is_constant() {
                args.push(node.clone());
            }
        });
        args
    }

    /// Checks the well-formedness of every node below and including this one.
    pub fn validate(&self) -> Result<()> {
        let mut outcome = Ok(());
        self.walk(|node| {
            if outcome.is_ok() {
                outcome = node.validate_node();
            }
        });
        outcome
    }

    fn validate_node(&self) -> Result<()> {
        match self.kind() {
            LiteralKind::Argument(_) | LiteralKind::Generator(_) => {}
            LiteralKind::Operator(op) => match &op.operation {
                Operation::Function(f) => f.check_arity(op.children.len())?,
                Operation::Tagged { .. } => {
                    if op.children.len() != 2 {
                        return Err(EquationError::arity(self.name(), 2, 2, op.children.len()));
                    }
                }
            },
            LiteralKind::Partition(_) => {
                if self.entry_count() == 0 {
                    return Err(EquationError::Arity {
                        name: self.name().to_string(),
                        expected: "at least 1 entry".to_string(),
                        actual: 0,
                    });
                }
            }
            LiteralKind::Equation(call) => {
                let expected = call.equation.args().len();
                if call.bindings.len() != expected {
                    return Err(EquationError::arity(self.name(), expected, expected, call.bindings.len()));
                }
            }
        }
        if self.contains(self) {
            return Err(EquationError::Cycle {
                name: self.name().to_string(),
            });
        }
        Ok(())
    }
}

/// Snapshot of every node reachable from a root
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Literal>,
}

impl DependencyGraph {
    /// Collects all nodes below `root`, including the insides of wrapped equations.
    pub fn from_root(root: &Literal) -> Self {
        let mut nodes = vec![root.clone()];
        let mut visited = AHashSet::new();
        visited.insert(root.clone());
        let mut cursor = 0;
        while cursor < nodes.len() {
            for child in nodes[cursor].children() {
                if visited.insert(child.clone()) {
                    nodes.push(child);
                }
            }
            cursor += 1;
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Literal] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that would be recomputed on the next evaluation
    pub fn dirty_nodes(&self) -> Vec<Literal> {
        self.nodes.iter().filter(|n| n.is_dirty()).cloned().collect()
    }

    /// Every node that depends on `node` within this graph, including itself
    pub fn affected_by(&self, node: &Literal) -> Vec<Literal> {
        self.nodes
            .iter()
            .filter(|n| *n == node || n.contains(node))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Function};

    #[test]
    fn test_identify_first_encounter_order() {
        let a = Literal::argument("a", 1.0);
        let b = Literal::argument("b", 2.0);
        let c = Literal::constant("c", 3.0);
        // (b * a) + (c + b)
        let left = Literal::binary(BinaryOp::Multiply, b.clone(), a.clone());
        let right = Literal::binary(BinaryOp::Add, c, b.clone());
        let root = Literal::binary(BinaryOp::Add, left, right);

        let args = root.identify();
        assert_eq!(args, vec![b, a]);
    }

    #[test]
    fn test_dirty_propagation_stops_at_dirty_ancestor() {
        let x = Literal::argument("x", 1.0);
        let sin = Literal::operator(Function::unary("sin", f64::sin), vec![x.clone()]).unwrap();
        let root = Literal::binary(BinaryOp::Add, sin.clone(), x.clone());

        root.evaluate().unwrap();
        assert!(!x.is_dirty() && !sin.is_dirty() && !root.is_dirty());

        x.set_value(2.0).unwrap();
        assert!(x.is_dirty() && sin.is_dirty() && root.is_dirty());
    }

    #[test]
    fn test_graph_snapshot() {
        let x = Literal::argument("x", 1.0);
        let y = Literal::argument("y", 1.0);
        let sum = Literal::binary(BinaryOp::Add, x.clone(), y.clone());
        let root = Literal::binary(BinaryOp::Multiply, sum.clone(), x.clone());

        let graph = DependencyGraph::from_root(&root);
        assert_eq!(graph.len(), 4);

        let affected = graph.affected_by(&y);
        assert_eq!(affected.len(), 3);
        assert!(affected.contains(&sum) && affected.contains(&root));

        root.evaluate().unwrap();
        assert!(graph.dirty_nodes().is_empty());
        y.set_value(2.0).unwrap();
        assert_eq!(graph.dirty_nodes(), vec![root, sum, y]);
    }
}
