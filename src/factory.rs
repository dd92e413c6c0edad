// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Name registry and expression-text compiler
//!
//! A [`Factory`] owns the names an expression may refer to. Text handed to
//! [`Factory::make_equation`] is parsed, every identifier is resolved against
//! the registry, and the resulting DAG is wrapped as an [`Equation`].

use crate::ast::{builtins, Equation, Function, Literal, LiteralKind, Reducer, Value, CONSTANTS};
use crate::config::EngineConfig;
use crate::error::{EquationError, Result};
use crate::io::{parse_equation, Syntax};
use ahash::AHashMap;
use log::{debug, warn};

/// Anything a name can resolve to
#[derive(Debug, Clone)]
pub enum Symbol {
    /// Argument, constant, partition or generator
    Literal(Literal),
    Function(Function),
    /// Callable as a function taking one operand per free argument
    Equation(Equation),
}

impl Symbol {
    pub fn label(&self) -> &'static str {
        match self {
            Symbol::Literal(literal) => literal.kind().label(),
            Symbol::Function(_) => "function",
            Symbol::Equation(_) => "equation",
        }
    }
}

/// Registry of named symbols
#[derive(Debug, Clone)]
pub struct Factory {
    symbols: AHashMap<String, Symbol>,
    config: EngineConfig,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// A factory with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut factory = Self {
            symbols: AHashMap::new(),
            config,
        };
        if factory.config.builtins {
            for function in builtins() {
                factory.insert(function.name().to_string(), Symbol::Function(function));
            }
        }
        if factory.config.constants {
            for (name, value) in CONSTANTS {
                factory.register_constant(name, value);
            }
        }
        factory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn insert(&mut self, name: String, symbol: Symbol) {
        if let Some(previous) = self.symbols.get(&name) {
            warn!("rebinding {} '{}' to a {}", previous.label(), name, symbol.label());
        }
        self.symbols.insert(name, symbol);
    }

    /// Registers a new free argument under `name`.
    pub fn register_argument(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Literal {
        let name = name.into();
        let literal = Literal::argument(name.clone(), value);
        self.insert(name, Symbol::Literal(literal.clone()));
        literal
    }

    pub fn register_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Literal {
        let name = name.into();
        let literal = Literal::constant(name.clone(), value);
        self.insert(name, Symbol::Literal(literal.clone()));
        literal
    }

    /// Registers an existing literal, shared with whoever else holds it.
    pub fn register_literal(&mut self, name: impl Into<String>, literal: &Literal) {
        self.insert(name.into(), Symbol::Literal(literal.clone()));
    }

    /// Registers a callable accepting between `min_args` and `max_args` operands.
    pub fn register_function<F>(
        &mut self,
        name: impl Into<String>,
        callable: F,
        min_args: usize,
        max_args: usize,
    ) -> Function
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let function = Function::new(name.clone(), min_args, max_args, callable);
        self.insert(name, Symbol::Function(function.clone()));
        function
    }

    pub fn register(&mut self, function: Function) {
        self.insert(function.name().to_string(), Symbol::Function(function));
    }

    pub fn register_partition(&mut self, name: impl Into<String>, partition: &Literal) -> Result<()> {
        let name = name.into();
        if !matches!(partition.kind(), LiteralKind::Partition(_)) {
            return Err(EquationError::lookup(format!("partition '{}'", name)));
        }
        self.insert(name, Symbol::Literal(partition.clone()));
        Ok(())
    }

    pub fn register_generator(&mut self, name: impl Into<String>, generator: &Literal) -> Result<()> {
        let name = name.into();
        if !matches!(generator.kind(), LiteralKind::Generator(_)) {
            return Err(EquationError::lookup(format!("generator '{}'", name)));
        }
        self.insert(name, Symbol::Literal(generator.clone()));
        Ok(())
    }

    /// Makes `equation` callable in expression text as `name(...)`.
    pub fn register_equation(&mut self, name: impl Into<String>, equation: &Equation) {
        self.insert(name.into(), Symbol::Equation(equation.clone()));
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Registered literal by name
    pub fn literal(&self, name: &str) -> Option<Literal> {
        match self.symbols.get(name) {
            Some(Symbol::Literal(literal)) => Some(literal.clone()),
            _ => None,
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds an equation using the configured `build_args` policy.
    pub fn make(&self, text: &str) -> Result<Equation> {
        self.make_equation(text, self.config.build_args)
    }

    /// Parses `text` into an equation.
    ///
    /// With `build_args`, unresolved names become new free arguments (one per
    /// distinct name); otherwise they are lookup errors.
    pub fn make_equation(&self, text: &str, build_args: bool) -> Result<Equation> {
        self.make_equation_with(text, build_args, Vec::<(String, Value)>::new())
    }

    /// Like [`Factory::make_equation`], with names in `consts` bound to
    /// constants for this equation only.
    pub fn make_equation_with<S, V>(
        &self,
        text: &str,
        build_args: bool,
        consts: impl IntoIterator<Item = (S, V)>,
    ) -> Result<Equation>
    where
        S: Into<String>,
        V: Into<Value>,
    {
        let syntax = parse_equation(text)?;
        let mut resolver = Resolver {
            factory: self,
            build_args,
            consts: consts.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            local: AHashMap::new(),
        };
        let root = resolver.resolve(&syntax)?;
        debug!("compiled '{}' into a {} rooted DAG", text.trim(), root.kind().label());
        Ok(Equation::new(text.trim(), root)?.with_reducer(self.config.combine))
    }
}

/// Per-call resolution state
struct Resolver<'a> {
    factory: &'a Factory,
    build_args: bool,
    consts: AHashMap<String, Value>,
    /// Literals created during this call, so repeated names share one node
    local: AHashMap<String, Literal>,
}

impl Resolver<'_> {
    fn resolve(&mut self, syntax: &Syntax) -> Result<Literal> {
        match syntax {
            Syntax::Number(n) => Ok(Literal::constant(n.to_string(), *n)),
            Syntax::Name(name) => self.resolve_name(name),
            Syntax::Str(text) => Err(EquationError::Parse(format!(
                "tag '{}' is only valid as a call parameter",
                text
            ))),
            Syntax::Bool(_) => Err(EquationError::Parse(
                "booleans are only valid as call parameters".to_string(),
            )),
            Syntax::Negate(operand) => Ok(Literal::unary("negative", |x| -x, self.resolve(operand)?)),
            Syntax::Binary { op, lhs, rhs } => {
                let lhs = self.resolve(lhs)?;
                let rhs = self.resolve(rhs)?;
                Ok(Literal::binary(*op, lhs, rhs))
            }
            Syntax::Call { name, args, keywords } => self.resolve_call(name, args, keywords),
        }
    }

    fn resolve_name(&mut self, name: &str) -> Result<Literal> {
        if let Some(literal) = self.local.get(name) {
            return Ok(literal.clone());
        }
        if let Some(value) = self.consts.get(name) {
            let literal = Literal::constant(name, value.clone());
            self.local.insert(name.to_string(), literal.clone());
            return Ok(literal);
        }
        match self.factory.lookup(name) {
            Some(Symbol::Literal(literal)) => Ok(literal.clone()),
            Some(Symbol::Equation(equation)) => Literal::equation_call(equation, Vec::new()),
            Some(Symbol::Function(_)) => Err(EquationError::lookup(format!("argument '{}'", name))),
            None if self.build_args => {
                let literal = Literal::argument(name, Value::default());
                self.local.insert(name.to_string(), literal.clone());
                Ok(literal)
            }
            None => Err(EquationError::lookup(name)),
        }
    }

    fn resolve_call(&mut self, name: &str, args: &[Syntax], keywords: &[(String, Syntax)]) -> Result<Literal> {
        let mut operands = Vec::new();
        let mut tag: Option<String> = None;
        let mut combine: Option<Reducer> = None;

        for arg in args {
            match arg {
                Syntax::Str(text) if tag.is_none() => tag = Some(text.clone()),
                Syntax::Str(_) | Syntax::Bool(_) if tag.is_some() && combine.is_none() => {
                    combine = self.combine(name, arg)?;
                }
                Syntax::Str(_) | Syntax::Bool(_) => {
                    return Err(EquationError::Parse(format!("unexpected parameter in call to '{}'", name)))
                }
                operand => operands.push(self.resolve(operand)?),
            }
        }
        for (key, value) in keywords {
            match (key.as_str(), value) {
                ("tag", Syntax::Str(text)) => tag = Some(text.clone()),
                ("combine", value) => combine = self.combine(name, value)?,
                _ => {
                    return Err(EquationError::Parse(format!(
                        "unexpected keyword '{}' in call to '{}'",
                        key, name
                    )))
                }
            }
        }

        let scoped = tag.is_some() || combine.is_some();
        match self.factory.lookup(name) {
            Some(Symbol::Function(function)) if scoped => {
                let op = function.binary_op().ok_or_else(|| EquationError::Tag {
                    name: name.to_string(),
                })?;
                let tag = tag.ok_or_else(|| EquationError::Parse(format!("'{}' has combine but no tag", name)))?;
                if operands.len() != 2 {
                    return Err(EquationError::arity(name, 2, 2, operands.len()));
                }
                let rhs = operands.pop();
                let lhs = operands.pop();
                match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => Ok(Literal::tagged(op, lhs, rhs, tag, combine)),
                    _ => Err(EquationError::arity(name, 2, 2, 0)),
                }
            }
            Some(Symbol::Function(function)) => Literal::operator(function.clone(), operands),
            Some(Symbol::Equation(_)) if scoped => Err(EquationError::Tag { name: name.to_string() }),
            Some(Symbol::Equation(equation)) => Literal::equation_call(equation, operands),
            Some(Symbol::Literal(_)) | None => Err(EquationError::lookup(format!("function '{}'", name))),
        }
    }

    fn combine(&self, name: &str, value: &Syntax) -> Result<Option<Reducer>> {
        match value {
            Syntax::Bool(true) => Ok(Some(self.factory.config.combine)),
            Syntax::Bool(false) => Ok(None),
            Syntax::Str(reducer) => reducer.parse().map(Some),
            _ => Err(EquationError::Parse(format!(
                "combine in call to '{}' must be a boolean or a reducer name",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_unresolved_names_become_arguments() {
        let factory = Factory::new();
        let eq = factory.make_equation("x * y + x", true).unwrap();
        assert_eq!(eq.arg_names(), vec!["x", "y"]);

        let err = factory.make_equation("x * y", false).unwrap_err();
        assert!(matches!(err, EquationError::Lookup { .. }));
    }

    #[test]
    fn test_numbers_are_constants() {
        let factory = Factory::new();
        let eq = factory.make_equation("2 * pi * r", true).unwrap();
        assert_eq!(eq.arg_names(), vec!["r"]);
        assert_relative_eq!(eq.call_values([1.0]).unwrap().as_scalar().unwrap(), 2.0 * PI);
    }

    #[test]
    fn test_registered_arguments_are_shared() {
        let mut factory = Factory::new();
        let a = factory.register_argument("A", 2.0);
        let e1 = factory.make_equation("A + 1", false).unwrap();
        let e2 = factory.make_equation("A * 3", false).unwrap();

        a.set_value(5.0).unwrap();
        assert_eq!(e1.call().unwrap(), Value::Scalar(6.0));
        assert_eq!(e2.call().unwrap(), Value::Scalar(15.0));
    }

    #[test]
    fn test_rebinding_affects_future_lookups_only() {
        let mut factory = Factory::new();
        factory.register_argument("A", 1.0);
        let before = factory.make_equation("A", false).unwrap();
        factory.register_argument("A", 7.0);
        let after = factory.make_equation("A", false).unwrap();

        assert_eq!(before.call().unwrap(), Value::Scalar(1.0));
        assert_eq!(after.call().unwrap(), Value::Scalar(7.0));
    }

    #[test]
    fn test_call_errors() {
        let factory = Factory::new();
        assert!(matches!(factory.make("nosuch(x)"), Err(EquationError::Lookup { .. })));
        assert!(matches!(factory.make("sin(x, y)"), Err(EquationError::Arity { .. })));
        assert!(matches!(factory.make("sin(x, 'tag1')"), Err(EquationError::Tag { .. })));
        assert!(matches!(factory.make("add(x, y, z, 'tag1')"), Err(EquationError::Arity { .. })));
        assert!(matches!(factory.make("x +* y"), Err(EquationError::Parse(_))));
        assert!(matches!(factory.make("x + 'tag1'"), Err(EquationError::Parse(_))));
    }

    #[test]
    fn test_combine_reducer_by_name() {
        let mut factory = Factory::new();
        let p = Literal::partition("p");
        p.add_entry(&Literal::constant("v1", 1.0), ["tag1"]).unwrap();
        p.add_entry(&Literal::constant("v2", 3.0), ["tag2"]).unwrap();
        factory.register_partition("p", &p).unwrap();

        let eq = factory.make("multiply(A, p, 'tag1', combine='max')").unwrap();
        assert_eq!(eq.call_values([2.0]).unwrap(), Value::Scalar(3.0));
        let eq = factory.make("multiply(A, p, tag='tag1', combine='mean')").unwrap();
        assert_eq!(eq.call_values([4.0]).unwrap(), Value::Scalar(3.5));
    }

    #[test]
    fn test_register_partition_checks_kind() {
        let mut factory = Factory::new();
        let a = Literal::argument("a", 1.0);
        assert!(factory.register_partition("a", &a).is_err());
        assert!(factory.lookup("a").is_none());
    }
}
