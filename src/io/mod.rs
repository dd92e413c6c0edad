// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - expression parsing and importing

mod importer;
mod parser;

pub use importer::import_equation_file;
pub use parser::{parse_equation, Syntax};
