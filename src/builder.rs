// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Programmatic equation construction
//!
//! [`Expr`] wraps a literal and overloads the arithmetic operators, so
//! equations can be written as ordinary Rust expressions:
//!
//! ```
//! use eqkernel::builder::{sin, Expr};
//!
//! let a = Expr::argument("a", 1.0);
//! let big_a = Expr::argument("A", 2.0);
//! let eq = (big_a * sin(a * 0.5)).get_equation().unwrap();
//! assert_eq!(eq.arg_names(), vec!["A", "a"]);
//! ```

use crate::ast::{BinaryOp, Equation, Function, Literal, Reducer, Value};
use crate::error::{EquationError, Result};
use crate::factory::Factory;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Builder-side handle to a literal
#[derive(Debug, Clone, PartialEq)]
pub struct Expr(Literal);

impl Expr {
    pub fn argument(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr(Literal::argument(name, value))
    }

    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr(Literal::constant(name, value))
    }

    pub fn literal(&self) -> &Literal {
        &self.0
    }

    pub fn into_literal(self) -> Literal {
        self.0
    }

    pub fn pow(self, exponent: impl Into<Expr>) -> Expr {
        Expr(Literal::binary(BinaryOp::Power, self.0, exponent.into().0))
    }

    /// Tag-scoped binary operation; see [`Literal::tagged`].
    pub fn tagged(self, op: BinaryOp, rhs: impl Into<Expr>, tag: &str, combine: Option<Reducer>) -> Expr {
        Expr(Literal::tagged(op, self.0, rhs.into().0, tag, combine))
    }

    pub fn add_tagged(self, rhs: impl Into<Expr>, tag: &str, combine: Option<Reducer>) -> Expr {
        self.tagged(BinaryOp::Add, rhs, tag, combine)
    }

    pub fn multiply_tagged(self, rhs: impl Into<Expr>, tag: &str, combine: Option<Reducer>) -> Expr {
        self.tagged(BinaryOp::Multiply, rhs, tag, combine)
    }

    /// Finalizes the expression into an equation named after its root.
    pub fn get_equation(&self) -> Result<Equation> {
        Equation::new(self.0.name(), self.0.clone())
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Expr(literal)
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

/// Numbers enter the DAG as constants
impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr(Literal::constant(value.to_string(), value))
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr(Literal::binary($op, self.0, rhs.into().0))
            }
        }

        impl<R: Into<Expr>> $trait<R> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr(Literal::binary($op, self.0.clone(), rhs.into().0))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::from(self).$method(rhs)
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                Expr::from(self).$method(rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Subtract);
binary_operator!(Mul, mul, BinaryOp::Multiply);
binary_operator!(Div, div, BinaryOp::Divide);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr(Literal::unary("negative", |x| -x, self.0))
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -self.clone()
    }
}

macro_rules! unary_functions {
    ($($name:ident => $f:expr),* $(,)?) => {
        $(
            #[doc = concat!("Elementwise `", stringify!($name), "`")]
            pub fn $name(x: impl Into<Expr>) -> Expr {
                Expr(Literal::unary(stringify!($name), $f, x.into().0))
            }
        )*
    };
}

unary_functions! {
    sin => f64::sin,
    cos => f64::cos,
    tan => f64::tan,
    arcsin => f64::asin,
    arccos => f64::acos,
    arctan => f64::atan,
    sinh => f64::sinh,
    cosh => f64::cosh,
    tanh => f64::tanh,
    exp => f64::exp,
    log => f64::ln,
    log10 => f64::log10,
    sqrt => f64::sqrt,
    abs => f64::abs,
}

/// Callable wrapper around a [`Function`]
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    function: Function,
}

impl FunctionBuilder {
    pub fn new(function: Function) -> Self {
        Self { function }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Applies the function, failing immediately on a wrong operand count.
    pub fn call(&self, operands: &[Expr]) -> Result<Expr> {
        let children = operands.iter().map(|e| e.0.clone()).collect();
        Literal::operator(self.function.clone(), children).map(Expr)
    }

    /// Tag-scoped application; only binary arithmetic accepts a tag.
    pub fn call_tagged(&self, lhs: &Expr, rhs: &Expr, tag: &str, combine: Option<Reducer>) -> Result<Expr> {
        let op = self.function.binary_op().ok_or_else(|| EquationError::Tag {
            name: self.function.name().to_string(),
        })?;
        Ok(lhs.clone().tagged(op, rhs, tag, combine))
    }
}

/// Callable wrapper embedding an [`Equation`] into a larger DAG
#[derive(Debug, Clone)]
pub struct EquationBuilder {
    equation: Equation,
}

impl EquationBuilder {
    pub fn new(equation: Equation) -> Self {
        Self { equation }
    }

    pub fn equation(&self) -> &Equation {
        &self.equation
    }

    /// Binds one operand per free argument of the wrapped equation.
    pub fn call(&self, operands: &[Expr]) -> Result<Expr> {
        let bindings = operands.iter().map(|e| e.0.clone()).collect();
        Literal::equation_call(&self.equation, bindings).map(Expr)
    }
}

/// Registers a callable and returns its builder.
pub fn wrap_function<F>(
    factory: &mut Factory,
    name: &str,
    min_args: usize,
    max_args: usize,
    callable: F,
) -> FunctionBuilder
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    FunctionBuilder::new(factory.register_function(name, callable, min_args, max_args))
}

pub fn wrap_partition(factory: &mut Factory, name: &str, partition: &Literal) -> Result<Expr> {
    factory.register_partition(name, partition)?;
    Ok(Expr(partition.clone()))
}

pub fn wrap_generator(factory: &mut Factory, name: &str, generator: &Literal) -> Result<Expr> {
    factory.register_generator(name, generator)?;
    Ok(Expr(generator.clone()))
}

pub fn wrap_equation(factory: &mut Factory, name: &str, equation: &Equation) -> EquationBuilder {
    factory.register_equation(name, equation);
    EquationBuilder::new(equation.clone())
}

pub fn wrap_argument(factory: &mut Factory, name: &str, value: impl Into<Value>) -> Expr {
    Expr(factory.register_argument(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_operator_overloads() {
        let a = Expr::argument("a", 3.0);
        let b = Expr::argument("b", 4.0);
        let eq = ((&a * &a + &b * &b).pow(0.5) - 1.0 / &b).get_equation().unwrap();
        assert_eq!(eq.arg_names(), vec!["a", "b"]);
        assert_relative_eq!(eq.call().unwrap().as_scalar().unwrap(), 4.75);
    }

    #[test]
    fn test_negation() {
        let x = Expr::argument("x", 2.0);
        let eq = (-x.pow(2.0)).get_equation().unwrap();
        assert_eq!(eq.call().unwrap(), Value::Scalar(-4.0));
    }

    #[test]
    fn test_function_builder_arity() {
        let mut factory = Factory::new();
        let f = wrap_function(&mut factory, "f", 2, 2, |args| {
            args[0].zip_with(&args[1], "f", |a, b| (a - b) / (a + b))
        });
        let a = Expr::argument("a", 2.0);
        let b = Expr::argument("b", 1.0);

        assert!(matches!(f.call(&[a.clone()]), Err(EquationError::Arity { .. })));
        let eq = sin(f.call(&[a, b]).unwrap()).get_equation().unwrap();
        assert_relative_eq!(eq.call().unwrap().as_scalar().unwrap(), (1.0f64 / 3.0).sin());
    }

    #[test]
    fn test_tag_on_non_binary_function() {
        let sqrt = FunctionBuilder::new(Function::unary("sqrt", f64::sqrt));
        let x = Expr::argument("x", 1.0);
        let err = sqrt.call_tagged(&x, &x, "tag1", None).unwrap_err();
        assert!(matches!(err, EquationError::Tag { .. }));
    }
}
