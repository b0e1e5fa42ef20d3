//! Declarative validation dependency graph.
//!
//! A graph maps a trigger path to the paths whose own validators should
//! re-run after the trigger validates successfully. The graph is a fixed
//! adjacency list: it is deliberately not closed under transitivity, which
//! is what keeps bidirectional and group configurations from cascading (the
//! orchestrator fans out exactly one hop).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Immutable trigger → dependents lookup table.
///
/// Built once per form configuration via [`DependencyGraphBuilder`] and
/// treated as read-only for the lifetime of a form session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Dependents registered for `trigger`, in insertion order.
    pub fn dependents_of(&self, trigger: &str) -> &[String] {
        self.edges.get(trigger).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All trigger paths with at least one dependent.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of trigger → dependent edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

/// Fluent builder accumulating trigger → dependents edges.
///
/// The builder owns a mutable adjacency map during construction; [`build`]
/// hands out defensive copies, so later builder calls never retroactively
/// change a previously returned graph.
///
/// [`build`]: DependencyGraphBuilder::build
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revalidate each of `dependents` whenever `trigger` changes.
    ///
    /// Cumulative across repeated calls for the same trigger; duplicates and
    /// self-dependencies are dropped with a diagnostic warning.
    pub fn when_changed<I, D>(mut self, trigger: impl Into<String>, dependents: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        let trigger = trigger.into();
        for dependent in dependents {
            self.insert(&trigger, dependent.into());
        }
        self
    }

    /// Link `a` and `b` both ways: single-hop edges only, no edge between
    /// the two fields' other dependents.
    pub fn bidirectional(self, a: impl Into<String>, b: impl Into<String>) -> Self {
        let a = a.into();
        let b = b.into();
        self.when_changed(a.clone(), [b.clone()]).when_changed(b, [a])
    }

    /// Make every field in the set a trigger for all the others.
    ///
    /// Produces N×(N−1) edges; expensive for large groups.
    pub fn group<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for trigger in &fields {
            for dependent in &fields {
                if dependent != trigger {
                    self.insert(trigger, dependent.clone());
                }
            }
        }
        self
    }

    /// Union another graph's edges into this builder, deduplicating per
    /// trigger. Never drops existing entries.
    pub fn merge(mut self, other: &DependencyGraph) -> Self {
        for (trigger, dependents) in &other.edges {
            for dependent in dependents {
                self.insert(trigger, dependent.clone());
            }
        }
        self
    }

    /// Snapshot the accumulated edges into an immutable graph.
    pub fn build(&self) -> DependencyGraph {
        DependencyGraph {
            edges: self.edges.clone(),
        }
    }

    fn insert(&mut self, trigger: &str, dependent: String) {
        if dependent == trigger {
            tracing::warn!("ignoring self-dependency for trigger '{}'", trigger);
            return;
        }
        let entry = self.edges.entry(trigger.to_string()).or_default();
        if entry.contains(&dependent) {
            tracing::warn!(
                "dependent '{}' already registered for trigger '{}'",
                dependent,
                trigger
            );
            return;
        }
        entry.push(dependent);
    }
}
