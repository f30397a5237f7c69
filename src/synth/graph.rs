// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack dependency graph

use std::collections::{BTreeMap, BTreeSet};

use crate::app::StackId;
use crate::errors::{SynthError, SynthResult};

/// Directed graph of "consumer deploys after producer" edges
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    labels: BTreeMap<StackId, String>,
    /// consumer -> producers
    dependencies: BTreeMap<StackId, BTreeSet<StackId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: StackId, label: impl Into<String>) {
        self.labels.insert(id, label.into());
        self.dependencies.entry(id).or_default();
    }

    /// `consumer` deploys after `producer`; self edges are ignored
    pub fn add_dependency(&mut self, consumer: StackId, producer: StackId) {
        if consumer == producer {
            return;
        }
        self.dependencies.entry(producer).or_default();
        self.dependencies.entry(consumer).or_default().insert(producer);
    }

    pub fn dependencies_of(&self, id: StackId) -> impl Iterator<Item = StackId> + '_ {
        self.dependencies.get(&id).into_iter().flatten().copied()
    }

    fn label(&self, id: StackId) -> String {
        self.labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Producers before consumers; ties broken by declaration order
    pub fn topological_order(&self) -> SynthResult<Vec<StackId>> {
        let mut remaining: BTreeMap<StackId, usize> = self
            .dependencies
            .iter()
            .map(|(id, producers)| (*id, producers.len()))
            .collect();

        let mut consumers: BTreeMap<StackId, Vec<StackId>> = BTreeMap::new();
        for (consumer, producers) in &self.dependencies {
            for producer in producers {
                consumers.entry(*producer).or_default().push(*consumer);
            }
        }

        let mut ready: BTreeSet<StackId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            remaining.remove(&next);
            for consumer in consumers.get(&next).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(consumer) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*consumer);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let stuck: Vec<String> = remaining.keys().map(|id| self.label(*id)).collect();
            return Err(SynthError::DependencyCycle(stuck.join(", ")));
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(usize, usize)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (i, label) in nodes.iter().enumerate() {
            graph.add_node(StackId(i), *label);
        }
        for (consumer, producer) in edges {
            graph.add_dependency(StackId(*consumer), StackId(*producer));
        }
        graph
    }

    #[test]
    fn test_chain_orders_producers_first() {
        let g = graph(&["Application", "Foundation", "Database"], &[(0, 2), (2, 1)]);
        assert_eq!(
            g.topological_order().unwrap(),
            vec![StackId(1), StackId(2), StackId(0)]
        );
    }

    #[test]
    fn test_independent_stacks_keep_declaration_order() {
        let g = graph(&["A", "B", "C"], &[]);
        assert_eq!(
            g.topological_order().unwrap(),
            vec![StackId(0), StackId(1), StackId(2)]
        );
    }

    #[test]
    fn test_diamond() {
        let g = graph(&["Root", "Left", "Right", "Leaf"], &[(1, 0), (2, 0), (3, 1), (3, 2)]);
        let order = g.topological_order().unwrap();
        assert_eq!(order.first(), Some(&StackId(0)));
        assert_eq!(order.last(), Some(&StackId(3)));
    }

    #[test]
    fn test_cycle_is_reported_with_labels() {
        let g = graph(&["A", "B", "C"], &[(0, 1), (1, 0), (2, 0)]);
        match g.topological_order() {
            Err(SynthError::DependencyCycle(stacks)) => {
                assert!(stacks.contains('A'));
                assert!(stacks.contains('B'));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_ignored() {
        let mut g = graph(&["A"], &[]);
        g.add_dependency(StackId(0), StackId(0));
        assert_eq!(g.dependencies_of(StackId(0)).count(), 0);
        assert_eq!(g.topological_order().unwrap(), vec![StackId(0)]);
    }
}
