// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! eqkernel: equation construction and incremental evaluation
//!
//! Expressions, written as text or built programmatically, become a DAG of
//! shared literals. Each node caches its last result; assigning an argument
//! invalidates exactly the nodes that depend on it. Partitions carry tagged
//! sub-quantities that tag-scoped operators can modify selectively or
//! collapse into one value.

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod io;

pub use ast::{
    Bindings, BinaryOp, CacheStats, Entry, Equation, Function, Literal, LiteralKind, Output, PartitionSource,
    Reducer, TagSet, Value,
};
pub use builder::{Expr, FunctionBuilder, EquationBuilder};
pub use config::EngineConfig;
pub use error::{EquationError, Result};
pub use factory::{Factory, Symbol};
pub use io::{import_equation_file, parse_equation};

/// Builds an equation from text with a default factory, creating arguments
/// for every unresolved name.
pub fn make_equation(text: &str) -> Result<Equation> {
    Factory::new().make_equation(text, true)
}
