// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Callable wrapper around a root literal

use super::dependency_graph::DependencyGraph;
use super::evaluator::CacheStats;
use super::node::{Literal, LiteralKind};
use super::value::{Reducer, Value};
use crate::error::{EquationError, Result};
use log::debug;
use std::fmt;

/// A named root literal together with its ordered free arguments
#[derive(Clone)]
pub struct Equation {
    name: String,
    root: Literal,
    args: Vec<Literal>,
    generators: Vec<Literal>,
    reducer: Reducer,
}

impl Equation {
    /// Wraps `root`, expanding generators and checking the DAG.
    ///
    /// Generators are expanded before the free arguments are collected so
    /// that arguments reachable only through generated entries are listed.
    pub fn new(name: impl Into<String>, root: Literal) -> Result<Self> {
        let name = name.into();
        let mut generators: Vec<Literal> = Vec::new();
        loop {
            let found: Vec<Literal> = DependencyGraph::from_root(&root)
                .nodes()
                .iter()
                .filter(|n| matches!(n.kind(), LiteralKind::Generator(_)) && !generators.contains(n))
                .cloned()
                .collect();
            if found.is_empty() {
                break;
            }
            for generator in &found {
                generator.regenerate()?;
            }
            generators.extend(found);
        }

        root.validate()?;
        let args = root.identify();
        debug!(
            "built equation '{}' with {} free argument(s), {} generator(s)",
            name,
            args.len(),
            generators.len()
        );

        Ok(Self {
            name,
            root,
            args,
            generators,
            reducer: Reducer::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Literal {
        &self.root
    }

    /// Free arguments in first-encounter order
    pub fn args(&self) -> &[Literal] {
        &self.args
    }

    pub fn arg_names(&self) -> Vec<&str> {
        self.args.iter().map(Literal::name).collect()
    }

    /// Free argument by name
    pub fn arg(&self, name: &str) -> Option<&Literal> {
        self.args.iter().find(|a| a.name() == name)
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    /// Sets the reduction used when the root yields one value per partition entry.
    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    /// Evaluates with the arguments' current values.
    pub fn call(&self) -> Result<Value> {
        for generator in &self.generators {
            generator.regenerate()?;
        }
        self.root.evaluate()?.collapse(self.reducer)
    }

    /// Assigns overrides to the free arguments, then evaluates.
    ///
    /// Overrides are permanent: the arguments keep their new values after the
    /// call, and every equation sharing them observes the change. Nothing is
    /// assigned unless the whole set of overrides is valid.
    pub fn call_with(&self, bindings: Bindings) -> Result<Value> {
        if bindings.is_empty() {
            return self.call();
        }
        let expected = self.args.len();
        if bindings.len() != expected {
            return Err(EquationError::arity(&self.name, expected, expected, bindings.len()));
        }

        let mut assigned: Vec<Option<Value>> = vec![None; expected];
        for (slot, value) in assigned.iter_mut().zip(bindings.positional) {
            *slot = Some(value);
        }
        for (name, value) in bindings.keyword {
            let index = self.position(&name)?;
            if assigned[index].is_some() {
                return Err(EquationError::arity(name, 1, 1, 2));
            }
            assigned[index] = Some(value);
        }

        for (arg, value) in self.args.iter().zip(assigned) {
            if let Some(value) = value {
                arg.set_value(value)?;
            }
        }
        self.call()
    }

    /// Evaluates with positional overrides.
    pub fn call_values<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Result<Value> {
        self.call_with(Bindings::positional(values))
    }

    fn position(&self, name: &str) -> Result<usize> {
        if let Some(index) = self.args.iter().position(|a| a.name() == name) {
            return Ok(index);
        }
        let mut constant = false;
        self.root.walk(|node| constant |= node.is_constant() && node.name() == name);
        if constant {
            Err(EquationError::Constraint { name: name.to_string() })
        } else {
            Err(EquationError::lookup(name))
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.root.cache_stats()
    }
}

impl fmt::Debug for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equation")
            .field("name", &self.name)
            .field("args", &self.arg_names())
            .field("reducer", &self.reducer)
            .finish()
    }
}

/// Positional and keyword overrides for [`Equation::call_with`]
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    /// Next positional override
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Override by argument name
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;

    fn sum_equation() -> (Literal, Literal, Equation) {
        let a = Literal::argument("A", 1.0);
        let b = Literal::argument("B", 2.0);
        let root = Literal::binary(BinaryOp::Add, a.clone(), b.clone());
        (a, b, Equation::new("E", root).unwrap())
    }

    #[test]
    fn test_overrides_are_permanent() {
        let (a, _, eq) = sum_equation();
        assert_eq!(eq.call_values([3.0, 4.0]).unwrap(), Value::Scalar(7.0));
        assert_eq!(a.value(), Some(Value::Scalar(3.0)));
        assert_eq!(eq.call().unwrap(), Value::Scalar(7.0));
    }

    #[test]
    fn test_keyword_overrides() {
        let (_, _, eq) = sum_equation();
        let out = eq.call_with(Bindings::new().arg(10.0).named("B", 5.0)).unwrap();
        assert_eq!(out, Value::Scalar(15.0));

        let err = eq.call_with(Bindings::new().arg(1.0).named("A", 5.0)).unwrap_err();
        assert!(matches!(err, EquationError::Arity { .. }));
        let err = eq.call_with(Bindings::new().arg(1.0).named("Z", 5.0)).unwrap_err();
        assert!(matches!(err, EquationError::Lookup { .. }));
    }

    #[test]
    fn test_override_count_must_match() {
        let (a, _, eq) = sum_equation();
        let err = eq.call_values([1.0]).unwrap_err();
        assert!(matches!(err, EquationError::Arity { actual: 1, .. }));
        assert_eq!(a.value(), Some(Value::Scalar(1.0)));
    }

    #[test]
    fn test_constant_override_rejected() {
        let a = Literal::argument("A", 1.0);
        let c = Literal::constant("c", 2.0);
        let eq = Equation::new("E", Literal::binary(BinaryOp::Multiply, a, c)).unwrap();
        assert_eq!(eq.arg_names(), vec!["A"]);
        let err = eq.call_with(Bindings::new().named("c", 3.0)).unwrap_err();
        assert!(matches!(err, EquationError::Constraint { .. }));
    }
}
