// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Functions applied by operator nodes

use super::value::Value;
use crate::error::{EquationError, Result};
use std::f64::consts;
use std::fmt;
use std::sync::Arc;

/// A user supplied elementwise computation
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Binary arithmetic. These are the only functions that accept tag parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 5] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Power,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Power => "power",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Power => "**",
        }
    }

    pub fn apply(&self, lhs: &Value, rhs: &Value) -> Result<Value> {
        let name = self.name();
        match self {
            BinaryOp::Add => lhs.zip_with(rhs, name, |a, b| a + b),
            BinaryOp::Subtract => lhs.zip_with(rhs, name, |a, b| a - b),
            BinaryOp::Multiply => lhs.zip_with(rhs, name, |a, b| a * b),
            BinaryOp::Divide => lhs.zip_with(rhs, name, |a, b| a / b),
            BinaryOp::Power => lhs.zip_with(rhs, name, f64::powf),
        }
    }
}

#[derive(Clone)]
enum FunctionKind {
    Binary(BinaryOp),
    Native(Callable),
}

/// A named computation with a declared arity range
#[derive(Clone)]
pub struct Function {
    name: String,
    min_args: usize,
    max_args: usize,
    kind: FunctionKind,
}

impl Function {
    /// Wraps a callable accepting between `min_args` and `max_args` operands.
    pub fn new<F>(name: impl Into<String>, min_args: usize, max_args: usize, callable: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            min_args,
            max_args: max_args.max(min_args),
            kind: FunctionKind::Native(Arc::new(callable)),
        }
    }

    /// A one-operand function applied elementwise
    pub fn unary(name: impl Into<String>, f: fn(f64) -> f64) -> Self {
        Self::new(name, 1, 1, move |args| Ok(args[0].map(f)))
    }

    pub fn binary(op: BinaryOp) -> Self {
        Self {
            name: op.name().to_string(),
            min_args: 2,
            max_args: 2,
            kind: FunctionKind::Binary(op),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self.kind {
            FunctionKind::Binary(op) => Some(op),
            FunctionKind::Native(_) => None,
        }
    }

    pub fn check_arity(&self, actual: usize) -> Result<()> {
        if actual < self.min_args || actual > self.max_args {
            return Err(EquationError::arity(&self.name, self.min_args, self.max_args, actual));
        }
        Ok(())
    }

    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        self.check_arity(args.len())?;
        match &self.kind {
            FunctionKind::Binary(op) => op.apply(&args[0], &args[1]),
            FunctionKind::Native(callable) => callable(args),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("binary", &self.binary_op())
            .finish()
    }
}

/// Constants registered by default
pub const CONSTANTS: [(&str, f64); 2] = [("pi", consts::PI), ("e", consts::E)];

/// The built-in function table
pub fn builtins() -> Vec<Function> {
    let mut table: Vec<Function> = BinaryOp::ALL.iter().map(|op| Function::binary(*op)).collect();

    let unary: [(&str, fn(f64) -> f64); 15] = [
        ("negative", |x| -x),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("arcsin", f64::asin),
        ("arccos", f64::acos),
        ("arctan", f64::atan),
        ("sinh", f64::sinh),
        ("cosh", f64::cosh),
        ("tanh", f64::tanh),
        ("exp", f64::exp),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("sqrt", f64::sqrt),
        ("abs", f64::abs),
    ];
    table.extend(unary.into_iter().map(|(name, f)| Function::unary(name, f)));
    table
}
