// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Literal evaluator with per-node caching
//!
//! Each node keeps its last output. A clean node answers from cache; a dirty
//! node evaluates its children, applies its operation, stores the result and
//! becomes clean again, unless an invalidation reached it while it was being
//! computed.

use super::dependency_graph::DependencyGraph;
use super::function::BinaryOp;
use super::node::{read, write, EquationCall, Literal, LiteralKind, Operation, Operator};
use super::partition::Entry;
use super::value::{Output, Part, Reducer, TagSet, Value};
use crate::error::{EquationError, Result};
use log::trace;

impl Literal {
    /// Evaluates this node, recomputing only what is dirty.
    pub fn evaluate(&self) -> Result<Output> {
        let mut baseline = {
            let state = read(&self.0.state);
            if !state.dirty {
                if let Some(cached) = &state.cache {
                    return Ok(cached.clone());
                }
            }
            state.stamp
        };

        let output = match self.kind() {
            LiteralKind::Argument(arg) => Output::Value(read(&arg.value).clone()),
            LiteralKind::Operator(op) => self.evaluate_operator(op)?,
            LiteralKind::Partition(p) => {
                let entries = read(&p.entries).clone();
                evaluate_entries(&entries)?
            }
            LiteralKind::Generator(g) => {
                let entries = read(&g.entries).clone();
                evaluate_entries(&entries)?
            }
            LiteralKind::Equation(call) => {
                self.rebind(call)?;
                // Rebinding invalidates this node through the wrapped root;
                // that invalidation is answered by the evaluation below.
                baseline = read(&self.0.state).stamp;
                let value = call
                    .equation
                    .root()
                    .evaluate()?
                    .collapse(call.equation.reducer())?;
                Output::Value(value)
            }
        };

        trace!("recomputed {} '{}'", self.kind().label(), self.name());
        let invalidated = {
            let mut state = write(&self.0.state);
            state.cache = Some(output.clone());
            state.evaluations += 1;
            if state.stamp == baseline {
                state.dirty = false;
            }
            state.stamp != baseline
        };
        // An invalidation that arrived mid-evaluation stopped here, since this
        // node was already dirty. Ancestors must not go clean above it.
        if invalidated {
            for parent in self.parents() {
                parent.mark_dirty();
            }
        }
        Ok(output)
    }

    fn evaluate_operator(&self, op: &Operator) -> Result<Output> {
        let inputs = op
            .children
            .iter()
            .map(Literal::evaluate)
            .collect::<Result<Vec<_>>>()?;

        match &op.operation {
            Operation::Function(function) => broadcast(function.name(), &inputs, |values| function.apply(values)),
            Operation::Tagged { op, tag, combine } => apply_tagged(*op, tag, *combine, &inputs[0], &inputs[1]),
        }
    }

    /// Copies binding values into the wrapped equation's arguments.
    ///
    /// Arguments already holding the bound value are left alone so that an
    /// unchanged call does not invalidate anything.
    fn rebind(&self, call: &EquationCall) -> Result<()> {
        let reducer = call.equation.reducer();
        for (arg, binding) in call.equation.args().iter().zip(&call.bindings) {
            let value = binding.evaluate()?.collapse(reducer)?;
            if arg.value().as_ref() != Some(&value) {
                arg.set_value(value)?;
            }
        }
        Ok(())
    }

    /// Cache statistics for the graph below this node
    pub fn cache_stats(&self) -> CacheStats {
        let graph = DependencyGraph::from_root(self);
        let mut stats = CacheStats {
            total_nodes: graph.len(),
            ..CacheStats::default()
        };
        for node in graph.nodes() {
            let state = read(&node.0.state);
            if !state.dirty && state.cache.is_some() {
                stats.cached_nodes += 1;
            }
            stats.evaluations += state.evaluations;
        }
        stats
    }
}

/// Flattens partition entries into per-entry outputs; nested partitions
/// inherit the tags of the entry that holds them.
fn evaluate_entries(entries: &[Entry]) -> Result<Output> {
    let mut parts = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.literal.evaluate()? {
            Output::Value(value) => parts.push(Part {
                value,
                tags: entry.tags.clone(),
            }),
            Output::Parts(inner) => parts.extend(inner.into_iter().map(|p| Part {
                value: p.value,
                tags: entry.tags.union(&p.tags),
            })),
        }
    }
    Ok(Output::Parts(parts))
}

/// Applies `f` across inputs. Partition-derived inputs are processed entry
/// by entry; plain values are broadcast to every entry.
fn broadcast(name: &str, inputs: &[Output], f: impl Fn(&[Value]) -> Result<Value>) -> Result<Output> {
    let mut count: Option<usize> = None;
    for input in inputs {
        if let Output::Parts(parts) = input {
            match count {
                Some(n) if n != parts.len() => {
                    return Err(EquationError::Shape {
                        name: name.to_string(),
                        left: n,
                        right: parts.len(),
                    })
                }
                _ => count = Some(parts.len()),
            }
        }
    }

    let Some(count) = count else {
        let values: Vec<Value> = inputs
            .iter()
            .filter_map(|input| match input {
                Output::Value(v) => Some(v.clone()),
                Output::Parts(_) => None,
            })
            .collect();
        return Ok(Output::Value(f(&values)?));
    };

    let mut parts = Vec::with_capacity(count);
    for i in 0..count {
        let mut values = Vec::with_capacity(inputs.len());
        let mut tags = TagSet::new();
        for input in inputs {
            match input {
                Output::Value(v) => values.push(v.clone()),
                Output::Parts(ps) => {
                    values.push(ps[i].value.clone());
                    tags = tags.union(&ps[i].tags);
                }
            }
        }
        parts.push(Part { value: f(&values)?, tags });
    }
    Ok(Output::Parts(parts))
}

/// Tag-scoped binary operation.
///
/// Selected entries get `lhs op rhs`; the others keep the value of the
/// partition-derived operand (the left one when both are). With `combine`
/// every entry is reduced into one value.
fn apply_tagged(op: BinaryOp, tag: &str, combine: Option<Reducer>, lhs: &Output, rhs: &Output) -> Result<Output> {
    let parts: Vec<Part> = match (lhs, rhs) {
        (Output::Value(a), Output::Value(b)) => return Ok(Output::Value(op.apply(a, b)?)),
        (Output::Parts(ps), Output::Value(b)) => ps
            .iter()
            .map(|p| select(p, tag, || op.apply(&p.value, b)))
            .collect::<Result<_>>()?,
        (Output::Value(a), Output::Parts(ps)) => ps
            .iter()
            .map(|p| select(p, tag, || op.apply(a, &p.value)))
            .collect::<Result<_>>()?,
        (Output::Parts(ls), Output::Parts(rs)) => {
            if ls.len() != rs.len() {
                return Err(EquationError::Shape {
                    name: op.name().to_string(),
                    left: ls.len(),
                    right: rs.len(),
                });
            }
            ls.iter()
                .zip(rs)
                .map(|(l, r)| {
                    let merged = Part {
                        value: l.value.clone(),
                        tags: l.tags.union(&r.tags),
                    };
                    select(&merged, tag, || op.apply(&l.value, &r.value))
                })
                .collect::<Result<_>>()?
        }
    };

    match combine {
        Some(reducer) => Ok(Output::Value(reducer.reduce(parts.iter().map(|p| &p.value))?)),
        None => Ok(Output::Parts(parts)),
    }
}

fn select(part: &Part, tag: &str, apply: impl FnOnce() -> Result<Value>) -> Result<Part> {
    if part.tags.selects(tag) {
        Ok(Part {
            value: apply()?,
            tags: part.tags.clone(),
        })
    } else {
        Ok(part.clone())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub cached_nodes: usize,
    pub total_nodes: usize,
    /// Recomputations performed over the lifetime of the nodes
    pub evaluations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        if self.total_nodes == 0 {
            0.0
        } else {
            (self.cached_nodes as f32 / self.total_nodes as f32) * 100.0
        }
    }
}
