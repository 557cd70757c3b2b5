//! Dependency graph: cycle detection and topological install order.
//!
//! Ported from the same white/gray/black depth-first approach used
//! elsewhere in this lineage for transitive-dependency graphs, reduced to
//! name-only nodes since package identity here is the workspace name alone.

use crate::core::error::GitPmError;
use anyhow::Result;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A directed graph of package names, edges pointing from a package to the
/// packages it depends on.
#[derive(Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as a node if it isn't already present.
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            idx
        } else {
            let idx = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), idx);
            idx
        }
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Walk the graph looking for a cycle, returning the chain of names
    /// that form it (closing back on the first repeated name) if found.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> = self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path = Vec::new();

        for node in self.graph.node_indices() {
            if colors[&node] == Color::White
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                return Some(cycle);
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<String>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).expect("gray node is on the path");
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                    cycle.push(self.graph[neighbor].clone());
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Names in dependency-first order: every package appears after all of
    /// its dependencies. Ties (independent subgraphs) break in the order
    /// nodes were first registered, so install order is deterministic.
    pub fn install_order(&self) -> Result<Vec<String>> {
        if let Some(chain) = self.detect_cycle() {
            return Err(GitPmError::CircularDependency { chain }.into());
        }
        let indices = toposort(&self.graph, None).expect("cycle check already ran");
        Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect())
    }
}
