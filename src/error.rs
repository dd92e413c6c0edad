// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared by the literal model, factory, builder and evaluator

use thiserror::Error;

/// Errors raised while constructing or calling equations.
///
/// Every variant is detected at construction or call time and returned
/// synchronously; no partially built equation is ever handed out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquationError {
    /// A name could not be resolved against the registry.
    #[error("unresolved name '{name}'")]
    Lookup { name: String },

    /// A function, operator or wrapped equation received the wrong number of operands.
    #[error("'{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },

    /// Malformed expression text.
    #[error("parse error: {0}")]
    Parse(String),

    /// The construction would make a literal its own descendant.
    #[error("'{name}' would become its own descendant")]
    Cycle { name: String },

    /// Attempted mutation or override of a const argument.
    #[error("argument '{name}' is constant")]
    Constraint { name: String },

    /// Array operands of incompatible length.
    #[error("shape mismatch in '{name}': {left} vs {right}")]
    Shape {
        name: String,
        left: usize,
        right: usize,
    },

    /// A user supplied callable or partition source failed.
    #[error("function '{name}' failed: {message}")]
    Function { name: String, message: String },

    /// A tag or combine parameter was given to a function that is not tag-scoped.
    #[error("'{name}' does not accept tag parameters")]
    Tag { name: String },
}

impl EquationError {
    pub fn lookup(name: impl Into<String>) -> Self {
        Self::Lookup { name: name.into() }
    }

    /// Arity error against a `[min, max]` range.
    pub fn arity(name: impl Into<String>, min: usize, max: usize, actual: usize) -> Self {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        Self::Arity {
            name: name.into(),
            expected,
            actual,
        }
    }

    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EquationError>;
