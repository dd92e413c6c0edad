// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Expression file importer

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read an expression file.
///
/// Blank lines and lines starting with `#` are skipped; the remaining lines
/// are joined into one expression, which is checked for syntax.
pub fn import_equation_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read expression file: {}", path.display()))?;

    let text = source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");

    super::parse_equation(&text)
        .with_context(|| format!("Failed to parse expression file: {}", path.display()))?;
    Ok(text)
}
