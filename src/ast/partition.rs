// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Partitions and generators: collections of tagged sub-literals

use super::node::{read, write, Literal, LiteralKind};
use super::value::TagSet;
use crate::error::{EquationError, Result};
use log::debug;
use std::sync::{Arc, RwLock};

/// One member of a partition
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub literal: Literal,
    pub tags: TagSet,
}

impl Entry {
    pub fn untagged(literal: Literal) -> Self {
        Self {
            literal,
            tags: TagSet::new(),
        }
    }
}

/// Ordered (literal, tags) pairs
#[derive(Default)]
pub struct Partition {
    pub(crate) entries: RwLock<Vec<Entry>>,
}

/// Produces the current membership of a generated partition.
///
/// Implementors wrap whatever external state decides membership; the
/// generator asks for a fresh list at the start of every equation call.
pub trait PartitionSource: Send + Sync {
    fn entries(&self) -> Result<Vec<Entry>>;
}

/// A literal used as a source yields its own partition entries, or itself as
/// a single untagged entry when it is not partition-like.
impl PartitionSource for Literal {
    fn entries(&self) -> Result<Vec<Entry>> {
        match self.kind() {
            LiteralKind::Partition(_) | LiteralKind::Generator(_) => Ok(Literal::entries(self)),
            _ => Ok(vec![Entry::untagged(self.clone())]),
        }
    }
}

impl<F> PartitionSource for F
where
    F: Fn() -> Result<Vec<Entry>> + Send + Sync,
{
    fn entries(&self) -> Result<Vec<Entry>> {
        self()
    }
}

/// Working partition re-derived from a source
pub struct Generator {
    pub(crate) source: Arc<dyn PartitionSource>,
    pub(crate) entries: RwLock<Vec<Entry>>,
}

impl Generator {
    pub(crate) fn new(source: Arc<dyn PartitionSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Literal {
    /// Re-derives a generator's entries from its source, invalidating it when
    /// the membership changed.
    ///
    /// A no-op for every other kind of literal.
    pub fn regenerate(&self) -> Result<()> {
        let LiteralKind::Generator(generator) = self.kind() else {
            return Ok(());
        };

        let fresh = generator
            .source
            .entries()
            .map_err(|e| match e {
                EquationError::Function { .. } => e,
                other => EquationError::function(self.name(), other.to_string()),
            })?;

        if fresh.iter().any(|e| e.literal == *self || e.literal.contains(self)) {
            return Err(EquationError::Cycle {
                name: self.name().to_string(),
            });
        }

        if *read(&generator.entries) == fresh {
            return Ok(());
        }

        let stale = std::mem::replace(&mut *write(&generator.entries), fresh.clone());
        for entry in &stale {
            if !fresh.iter().any(|f| f.literal == entry.literal) {
                entry.literal.unlink_parent(self);
            }
        }
        for entry in &fresh {
            if !stale.iter().any(|s| s.literal == entry.literal) {
                entry.literal.link_parent(self);
            }
        }

        debug!("generator '{}' re-derived {} entries", self.name(), fresh.len());
        self.mark_dirty();
        Ok(())
    }

    /// Number of entries currently held by a partition or generator
    pub fn entry_count(&self) -> usize {
        match self.kind() {
            LiteralKind::Partition(p) => read(&p.entries).len(),
            LiteralKind::Generator(g) => read(&g.entries).len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Value};
    use std::sync::Mutex;

    #[test]
    fn test_generator_mirrors_partition() {
        let p = Literal::partition("p");
        let v1 = Literal::argument("v1", 1.0);
        let v2 = Literal::argument("v2", 2.0);
        p.add_entry(&v1, ["a"]).unwrap();

        let g = Literal::generator_of("g", &p);
        g.regenerate().unwrap();
        assert_eq!(g.entry_count(), 1);

        p.add_entry(&v2, ["b"]).unwrap();
        assert_eq!(g.entry_count(), 1);
        g.regenerate().unwrap();
        assert_eq!(g.entry_count(), 2);
        assert!(g.entries()[1].tags.contains("b"));
    }

    #[test]
    fn test_closure_source() {
        let count = Arc::new(Mutex::new(1usize));
        let shared = count.clone();
        let g = Literal::generator("g", move || -> Result<Vec<Entry>> {
            let n = *shared.lock().unwrap();
            Ok((0..n)
                .map(|i| Entry::untagged(Literal::constant(format!("c{}", i), Value::Scalar(i as f64))))
                .collect())
        });

        g.regenerate().unwrap();
        assert_eq!(g.entry_count(), 1);
        *count.lock().unwrap() = 3;
        g.regenerate().unwrap();
        assert_eq!(g.entry_count(), 3);
    }

    #[test]
    fn test_source_containing_generator_is_a_cycle() {
        let p = Literal::partition("p");
        let g = Literal::generator_of("g", &p);
        let a = Literal::argument("a", 1.0);
        p.add_entry(&Literal::binary(BinaryOp::Multiply, a, g.clone()), ["t"]).unwrap();

        assert!(matches!(g.regenerate(), Err(EquationError::Cycle { ref name }) if name == "g"));
        assert_eq!(g.entry_count(), 0);
    }

    #[test]
    fn test_source_failure_is_reported() {
        let g = Literal::generator("g", || -> Result<Vec<Entry>> { Err(EquationError::lookup("structure")) });
        let err = g.regenerate().unwrap_err();
        assert!(matches!(err, EquationError::Function { ref name, .. } if name == "g"));
    }
}
