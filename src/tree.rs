//! The test-specification tree.
//!
//! One compilation pass over a style sheet produces a forest of [`GroupNode`]
//! roots. The builder owns every node until the run's tree is complete;
//! ownership then passes to the executor, which performs a read-only
//! traversal. Serde derives are provided so hosts can snapshot a finished
//! tree programmatically.

use serde::Serialize;

use crate::compiler::Value;
use crate::errors::HarnessError;

/// A named test group. Children preserve declaration order, which is the
/// execution order; groups and cases may interleave freely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNode {
    pub name: String,
    pub children: Vec<TreeChild>,
}

impl GroupNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Total number of cases in this group, recursively.
    pub fn case_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                TreeChild::Group(g) => g.case_count(),
                TreeChild::Case(_) => 1,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TreeChild {
    Group(GroupNode),
    Case(CaseNode),
}

/// One test case: its deferred assertions, any `@error` messages captured
/// while its body compiled, and at most one deferred content comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseNode {
    pub name: String,
    pub assertions: Vec<Assertion>,
    pub captured_errors: Vec<String>,
    pub content_ref: Option<usize>,
}

impl CaseNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assertions: Vec::new(),
            captured_errors: Vec::new(),
            content_ref: None,
        }
    }
}

/// A deferred predicate, evaluated at execution time against the owning
/// case's final state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Assertion {
    /// Two compile-time values must be equal.
    ValueEq { actual: Value, expected: Value },
    /// The case's captured errors must contain this message.
    ErrorRaised { message: String },
}

/// A registered content comparison. Created unresolved during the build
/// phase; the resolver fills in both texts after compilation; the executor
/// consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    pub index: usize,
    pub actual: Option<String>,
    pub expected: Option<String>,
}

impl ContentBlock {
    pub fn is_resolved(&self) -> bool {
        self.actual.is_some() && self.expected.is_some()
    }
}

/// The per-run content-block registry. Indices are assigned monotonically
/// from zero; a fresh registry per run keeps indices from leaking across
/// independent compilations.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ContentRegistry {
    blocks: Vec<ContentBlock>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next block index.
    pub fn allocate(&mut self) -> usize {
        let index = self.blocks.len();
        self.blocks.push(ContentBlock {
            index,
            actual: None,
            expected: None,
        });
        index
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentBlock> {
        self.blocks.get(index)
    }

    /// Fills in a block's actual/expected pair. Resolving a block twice is a
    /// harness bug, not a user error.
    pub fn resolve(
        &mut self,
        index: usize,
        actual: String,
        expected: String,
    ) -> Result<(), HarnessError> {
        let block = self
            .blocks
            .get_mut(index)
            .ok_or_else(|| HarnessError::internal(format!("no content block {index}")))?;
        if block.is_resolved() {
            return Err(HarnessError::internal(format!(
                "content block {index} resolved twice"
            )));
        }
        block.actual = Some(actual);
        block.expected = Some(expected);
        Ok(())
    }

    pub fn unresolved_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_resolved()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_indices_are_monotonic_from_zero() {
        let mut registry = ContentRegistry::new();
        assert_eq!(registry.allocate(), 0);
        assert_eq!(registry.allocate(), 1);
        assert_eq!(registry.allocate(), 2);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.unresolved_count(), 3);
    }

    #[test]
    fn resolving_twice_is_an_internal_error() {
        let mut registry = ContentRegistry::new();
        let i = registry.allocate();
        registry.resolve(i, "a".into(), "b".into()).unwrap();
        assert!(registry.get(i).unwrap().is_resolved());
        assert!(registry.resolve(i, "a".into(), "b".into()).is_err());
    }

    #[test]
    fn case_count_recurses_through_nested_groups() {
        let mut inner = GroupNode::new("inner");
        inner.children.push(TreeChild::Case(CaseNode::new("a")));
        let mut root = GroupNode::new("root");
        root.children.push(TreeChild::Case(CaseNode::new("b")));
        root.children.push(TreeChild::Group(inner));
        assert_eq!(root.case_count(), 2);
    }
}
