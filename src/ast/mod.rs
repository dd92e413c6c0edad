// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Literal model
//!
//! Defines the DAG node types, their evaluation with per-node caching, and
//! the callable [`Equation`] wrapper.

mod dependency_graph;
mod equation;
mod evaluator;
mod function;
mod node;
mod partition;
mod value;

pub use dependency_graph::DependencyGraph;
pub use equation::{Bindings, Equation};
pub use evaluator::CacheStats;
pub use function::{builtins, BinaryOp, Callable, Function, CONSTANTS};
pub use node::{Argument, EquationCall, Literal, LiteralKind, Operation, Operator};
pub use partition::{Entry, Generator, Partition, PartitionSource};
pub use value::{Output, Part, Reducer, TagSet, Value};
